//! Radio link bookkeeping
//!
//! The radio runs on a coprocessor. It forwards client events to the MCU as
//! [`LinkMessage`]s and executes the [`HostMessage`]s the MCU sends back.
//! [`LinkSession`] holds the MCU's view of the connection and decides what
//! to send during the transport phase of each cycle.

use serde::{Deserialize, Serialize};

use crate::signals::Signals;
use crate::traits::{Transport, TransportError};

/// Events from the radio coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkMessage {
    Connected,
    Disconnected,
    /// Client wrote the notification descriptor
    NotificationsWritten(bool),
    /// Central answered the connection parameter request
    ParametersUpdated,
    /// Client asked to capture the empty baseline
    CaptureRequested,
}

impl LinkMessage {
    /// Signal bits the message raises
    pub const fn signals(self) -> Signals {
        match self {
            LinkMessage::Connected => Signals::CONNECTED,
            LinkMessage::Disconnected => Signals::DISCONNECTED,
            LinkMessage::NotificationsWritten(true) => Signals::NOTIFY_ON,
            LinkMessage::NotificationsWritten(false) => Signals::NOTIFY_OFF,
            LinkMessage::ParametersUpdated => Signals::PARAMS_UPDATED,
            LinkMessage::CaptureRequested => Signals::CAPTURE,
        }
    }
}

/// Commands to the radio coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostMessage {
    /// Notify the level characteristic, whole percent
    Notify(u8),
    /// Write back the notification descriptor value
    NotificationState(bool),
    /// Request the preferred connection parameters
    RequestParameters,
}

/// What a transport sync did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncReport {
    /// Level pushed to the client
    pub notified: Option<u8>,
    pub state_published: bool,
    pub parameters_requested: bool,
    /// First failure; later steps still run
    pub error: Option<TransportError>,
}

/// MCU-side state of the client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkSession {
    connected: bool,
    notifications_enabled: bool,
    /// Notification descriptor changed and must be written back
    state_dirty: bool,
    /// Connection parameter request not yet issued on this connection
    parameters_pending: bool,
    last_reported: u8,
}

impl LinkSession {
    pub const fn new() -> Self {
        Self {
            connected: false,
            notifications_enabled: false,
            state_dirty: false,
            parameters_pending: true,
            last_reported: 0,
        }
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub const fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    pub const fn last_reported(&self) -> u8 {
        self.last_reported
    }

    pub fn on_connect(&mut self) {
        self.connected = true;
    }

    /// Drop back to the unconnected defaults
    ///
    /// The notification descriptor is written back as disabled on the next
    /// sync, and the next connection gets its own parameter request.
    pub fn on_disconnect(&mut self) {
        self.connected = false;
        self.notifications_enabled = false;
        self.state_dirty = true;
        self.parameters_pending = true;
        self.last_reported = 0;
    }

    pub fn on_notifications_written(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
        self.state_dirty = true;
    }

    pub fn on_parameters_updated(&mut self) {
        self.parameters_pending = false;
    }

    /// Apply the link bits of a drained signal set
    ///
    /// Disconnect is applied before connect so a quick reconnect ends
    /// connected with a fresh session.
    pub fn apply(&mut self, signals: Signals) {
        if signals.contains(Signals::DISCONNECTED) {
            self.on_disconnect();
        }
        if signals.contains(Signals::CONNECTED) {
            self.on_connect();
        }
        if signals.contains(Signals::NOTIFY_ON) {
            self.on_notifications_written(true);
        } else if signals.contains(Signals::NOTIFY_OFF) {
            self.on_notifications_written(false);
        }
        if signals.contains(Signals::PARAMS_UPDATED) {
            self.on_parameters_updated();
        }
    }

    /// Push pending link work to the transport
    ///
    /// The descriptor write-back happens whether or not a client is still
    /// connected, since a disconnect also marks it dirty. Everything else
    /// needs a live connection. A failed step is not retried within the
    /// same sync.
    pub fn sync<T: Transport>(&mut self, transport: &mut T, level: u8) -> SyncReport {
        let mut report = SyncReport::default();

        if self.state_dirty {
            match transport.publish_notification_state(self.notifications_enabled) {
                Ok(()) => report.state_published = true,
                Err(e) => report.error = report.error.or(Some(e)),
            }
            self.state_dirty = false;
        }

        if !self.connected {
            return report;
        }

        if self.parameters_pending {
            match transport.request_connection_parameters() {
                Ok(()) => report.parameters_requested = true,
                Err(e) => report.error = report.error.or(Some(e)),
            }
            self.parameters_pending = false;
        }

        if self.notifications_enabled && level != self.last_reported {
            match transport.notify(level) {
                Ok(()) => {
                    self.last_reported = level;
                    report.notified = Some(level);
                }
                Err(e) => report.error = report.error.or(Some(e)),
            }
        }

        report
    }
}

impl Default for LinkSession {
    fn default() -> Self {
        Self::new()
    }
}
