//! Scan engine tunables
//!
//! The core never computes these; it stores what the board configuration
//! says and hands it to the scan engine. Values are in the scan engine's own
//! register units.

/// Settings for one electrode's capacitance measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ElectrodeTuning {
    /// Sense and modulation clock divider (always equal)
    pub clock_divider: u8,
    /// Modulation (charge) current
    pub modulation_current: u8,
    /// Compensation current, trims out the electrode's parasitic capacitance
    pub compensation_current: u8,
}

/// Tunables for the whole array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanTuning<const N: usize> {
    pub clock_divider: u8,
    pub modulation_current: u8,
    pub compensation_current: [u8; N],
}

impl<const N: usize> ScanTuning<N> {
    /// Same compensation current on every electrode
    pub const fn uniform(clock_divider: u8, modulation_current: u8, compensation: u8) -> Self {
        Self {
            clock_divider,
            modulation_current,
            compensation_current: [compensation; N],
        }
    }

    /// Resolved settings for electrode `index`
    pub fn electrode(&self, index: usize) -> ElectrodeTuning {
        ElectrodeTuning {
            clock_divider: self.clock_divider,
            modulation_current: self.modulation_current,
            compensation_current: self.compensation_current.get(index).copied().unwrap_or(0),
        }
    }
}
