//! Events that trigger state transitions

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Scan events
    /// A scan is running, either just requested or still in progress
    ScanRequested,
    /// Scan engine reports idle with fresh readings
    ScanComplete,
    /// Scan stayed busy for too many wakes
    ScanTimedOut,
    /// Bus error talking to the scan engine
    ScanFailed,

    // Cycle events
    /// Level computed from the latest readings
    Processed,
    /// Link and telemetry work done for this cycle
    Synced,
    /// Wake timer, motion or a link event ended the sleep
    Woken,
}
