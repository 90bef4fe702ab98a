//! Operating state machine
//!
//! One measurement cycle walks the states in a fixed ring:
//!
//! ```text
//! Scanning -> AwaitingScanCompletion -> Processing -> TransportSync -> Sleeping
//!    ^                                                                    |
//!    +--------------------------------------------------------------------+
//! ```
//!
//! Scan failures short-circuit to `Processing`, which then works with the
//! last good readings.

use super::events::Event;

/// Device operating states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Start a scan of all electrodes
    Scanning,
    /// Low-power wait for the scan to finish
    AwaitingScanCompletion,
    /// Read counts and compute the level
    Processing,
    /// Notify the client and emit telemetry
    TransportSync,
    /// Deep sleep until the wake timer fires
    Sleeping,
}

/// Unrecoverable controller failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// An event arrived in a state that has no transition for it
    Unreachable { state: State, event: Event },
}

impl State {
    /// Process an event and return the next state
    ///
    /// `None` means the controller produced an event the current state does
    /// not handle, which only happens if its control flow is corrupted.
    pub fn transition(self, event: Event) -> Option<Self> {
        use Event::*;
        use State::*;

        let next = match (self, event) {
            // Scanning transitions
            (Scanning, ScanRequested) => AwaitingScanCompletion,
            (Scanning, ScanFailed) => Processing,

            // AwaitingScanCompletion transitions
            (AwaitingScanCompletion, ScanComplete) => Processing,
            (AwaitingScanCompletion, ScanTimedOut) => Processing,
            (AwaitingScanCompletion, ScanFailed) => Processing,

            // Processing transitions
            (Processing, Processed) => TransportSync,

            // TransportSync transitions
            (TransportSync, Synced) => Sleeping,

            // Sleeping transitions
            (Sleeping, Woken) => Scanning,

            _ => return None,
        };

        Some(next)
    }

    /// Same as [`State::transition`], with the failure as a [`Fault`]
    pub fn next(self, event: Event) -> Result<Self, Fault> {
        self.transition(event)
            .ok_or(Fault::Unreachable { state: self, event })
    }
}
