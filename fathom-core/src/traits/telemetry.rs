//! Telemetry sink trait

use crate::telemetry::TelemetryRecord;

/// Errors from a telemetry sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryError {
    /// Record did not fit the frame buffer
    Encode,
    /// Sink could not accept the frame
    Write,
}

/// Trait for the data log output
pub trait Telemetry {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}
