//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Interrupt-side tasks raise bits in [`SIGNALS`] and then wake the
//! controller through [`WAKEUP`]; the controller consumes the bits on its
//! next step.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicU32;

use fathom_core::link::HostMessage;
use fathom_core::signals::{SignalFlags, Signals};
use fathom_core::telemetry::TelemetryRecord;
use fathom_hal_rp2040::WakePeriod;

/// Channel capacity for messages to the radio coprocessor
const HOST_CHANNEL_SIZE: usize = 8;

/// Channel capacity for telemetry records
const TELEMETRY_CHANNEL_SIZE: usize = 4;

/// Pending wake sources for the controller
pub static SIGNALS: SignalFlags = SignalFlags::new();

/// Signal that at least one bit was raised in [`SIGNALS`]
pub static WAKEUP: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Wake timer period (updated when the controller re-arms the timer)
pub static WAKE_PERIOD: WakePeriod = Signal::new();

/// Messages for the radio coprocessor
pub static HOST_MESSAGES: Channel<CriticalSectionRawMutex, HostMessage, HOST_CHANNEL_SIZE> =
    Channel::new();

/// Telemetry records waiting for the data log UART
pub static TELEMETRY_RECORDS: Channel<
    CriticalSectionRawMutex,
    TelemetryRecord,
    TELEMETRY_CHANNEL_SIZE,
> = Channel::new();

/// Telemetry records dropped because the data log fell behind
pub static TELEMETRY_DROPPED: AtomicU32 = AtomicU32::new(0);

/// Raise wake sources and wake the controller
pub fn raise(signals: Signals) {
    SIGNALS.raise(signals);
    WAKEUP.signal(());
}
