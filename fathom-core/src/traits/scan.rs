//! Capacitive scan engine trait

pub use crate::config::ElectrodeTuning;

/// Errors reported by a scan engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanError {
    /// Bus transaction with the controller failed
    Bus,
    /// Electrode index past the end of the array
    InvalidElectrode,
    /// Scan stayed busy for longer than the configured number of wakes
    Timeout,
}

/// Trait for capacitance-to-digital front ends
///
/// A scan measures every electrode once. Readings of the last completed scan
/// stay available until the next one finishes.
pub trait ScanEngine {
    /// Check whether a scan is still converting
    fn is_busy(&mut self) -> Result<bool, ScanError>;

    /// Raw count of `electrode` from the last completed scan
    ///
    /// Counts must stay within `0..=i16::MAX`; an empty baseline above that
    /// cannot be stored and its capture is rejected.
    fn read_raw(&mut self, electrode: usize) -> Result<u16, ScanError>;

    /// Start scanning all electrodes
    ///
    /// Only called while the engine is idle.
    fn start_scan(&mut self) -> Result<(), ScanError>;

    /// Program the measurement settings of one electrode
    fn apply_tuning(&mut self, electrode: usize, tuning: &ElectrodeTuning)
        -> Result<(), ScanError>;
}
