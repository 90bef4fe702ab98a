//! Board glue between the Embassy tasks and the core traits
//!
//! Pin assignments (Raspberry Pi Pico):
//! - MPR121 on I2C0: SDA GPIO4, SCL GPIO5
//! - Radio coprocessor on UART1: TX GPIO8, RX GPIO9
//! - Data log on UART0: TX GPIO0
//! - Accelerometer motion interrupt: GPIO15, active high

use core::sync::atomic::Ordering;

use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::Instant;

use fathom_core::link::HostMessage;
use fathom_core::telemetry::TelemetryRecord;
use fathom_core::traits::{Telemetry, TelemetryError, Transport, TransportError};
use fathom_core::LevelController;
use fathom_drivers::capsense::{Clock, Mpr121Scanner};
use fathom_hal_rp2040::{RoscWakeTimer, Rp2040RowStorage};

use crate::channels::{HOST_MESSAGES, TELEMETRY_DROPPED, TELEMETRY_RECORDS};
use crate::config::ELECTRODES;

/// MPR121 I2C bus
pub type SensorBus = I2c<'static, I2C0, Blocking>;

/// Scan engine of this board
pub type Scanner = Mpr121Scanner<SensorBus, EmbassyClock>;

/// Fully wired controller
pub type SensorController = LevelController<
    'static,
    Scanner,
    ChannelTransport,
    RoscWakeTimer<'static>,
    ChannelTelemetry,
    Rp2040RowStorage<'static>,
    ELECTRODES,
>;

/// Embassy time driver as a microsecond clock
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_us(&self) -> u64 {
        Instant::now().as_micros()
    }
}

/// [`Transport`] feeding the link TX task
pub struct ChannelTransport;

impl ChannelTransport {
    fn send(&mut self, msg: HostMessage) -> Result<(), TransportError> {
        HOST_MESSAGES
            .try_send(msg)
            .map_err(|_| TransportError::Busy)
    }
}

impl Transport for ChannelTransport {
    fn notify(&mut self, level: u8) -> Result<(), TransportError> {
        self.send(HostMessage::Notify(level))
    }

    fn publish_notification_state(&mut self, enabled: bool) -> Result<(), TransportError> {
        self.send(HostMessage::NotificationState(enabled))
    }

    fn request_connection_parameters(&mut self) -> Result<(), TransportError> {
        self.send(HostMessage::RequestParameters)
    }
}

/// [`Telemetry`] feeding the data log TX task
pub struct ChannelTelemetry;

impl Telemetry for ChannelTelemetry {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        TELEMETRY_RECORDS.try_send(record.clone()).map_err(|_| {
            TELEMETRY_DROPPED.fetch_add(1, Ordering::Relaxed);
            TelemetryError::Write
        })
    }
}
