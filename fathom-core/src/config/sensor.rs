//! Per-device sensor configuration

use crate::fixed::Q8_8;
use crate::level::{ElectrodeWeights, Geometry};
use crate::telemetry::TelemetryMode;
use crate::wake::{CadenceConfig, OscillatorConfig};

use super::tuning::ScanTuning;

/// Largest electrode array the wire formats can carry
pub const MAX_ELECTRODES: usize = 16;

/// Electrode count of the reference strip
pub const REFERENCE_ELECTRODES: usize = 12;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Fewer than two electrodes, no pitch to speak of
    TooFewElectrodes,
    /// More electrodes than [`MAX_ELECTRODES`]
    TooManyElectrodes,
    /// Strip height of zero
    ZeroHeight,
    /// Weight table sums to zero, level would never rise
    ZeroWeights,
    /// A scale factor is zero or negative
    InvalidScale { electrode: u8 },
    /// Submersion threshold below zero
    NegativeThreshold,
    /// Fast cadence is zero or slower than the slow cadence
    InvalidCadence,
    /// Oscillator nominal frequency is zero or tolerance is 100 % or more
    InvalidOscillator,
    /// Scan timeout of zero wakes
    ZeroScanTimeout,
}

/// Complete sensor configuration for an `N`-electrode strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig<const N: usize> {
    /// Per-electrode gain, 8.8
    pub scales: [Q8_8; N],
    pub weights: ElectrodeWeights<N>,
    /// Processed counts above this mark an electrode submerged
    pub threshold: i32,
    /// Height of the topmost electrode above the bottom one
    pub max_height_mm: u16,
    pub tuning: ScanTuning<N>,
    pub cadence: CadenceConfig,
    pub oscillator: OscillatorConfig,
    /// Wakes to wait for a busy scan before giving up on it
    pub scan_timeout_wakes: u16,
    /// Cycles to stay on the fast cadence after a motion interrupt
    pub motion_hold_cycles: u16,
    pub telemetry: TelemetryMode,
    /// Byte offset of the calibration record in persistent storage
    pub calibration_offset: u32,
}

impl<const N: usize> SensorConfig<N> {
    /// Check the configuration for values the controller cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if N > MAX_ELECTRODES {
            return Err(ConfigError::TooManyElectrodes);
        }
        self.geometry()?;

        if self.weights.total() == 0 {
            return Err(ConfigError::ZeroWeights);
        }
        if let Some(i) = self.scales.iter().position(|s| s.to_bits() <= 0) {
            return Err(ConfigError::InvalidScale { electrode: i as u8 });
        }
        if self.threshold < 0 {
            return Err(ConfigError::NegativeThreshold);
        }
        if self.cadence.fast_ms == 0 || self.cadence.fast_ms > self.cadence.slow_ms {
            return Err(ConfigError::InvalidCadence);
        }
        if self.oscillator.nominal_hz == 0 || self.oscillator.tolerance_pct >= 100 {
            return Err(ConfigError::InvalidOscillator);
        }
        if self.scan_timeout_wakes == 0 {
            return Err(ConfigError::ZeroScanTimeout);
        }

        Ok(())
    }

    /// Strip geometry derived from the height and electrode count
    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        Geometry::uniform(self.max_height_mm, N)
    }
}

/// Raw count span of a full-scale electrode on the reference strip
pub const REFERENCE_SENSOR_SPAN: i32 = 600;

/// The 153 mm, 12-electrode reference strip
///
/// The bottom and top electrodes are shorter than the others and get extra
/// gain to match.
pub const fn reference() -> SensorConfig<REFERENCE_ELECTRODES> {
    let mut scales = [Q8_8::ONE; REFERENCE_ELECTRODES];
    scales[0] = Q8_8::from_bits(0x01D0);
    scales[REFERENCE_ELECTRODES - 1] = Q8_8::from_bits(0x01C0);

    SensorConfig {
        scales,
        weights: ElectrodeWeights::uniform(),
        threshold: REFERENCE_SENSOR_SPAN / 2,
        max_height_mm: 153,
        tuning: ScanTuning::uniform(9, 150, 20),
        cadence: CadenceConfig {
            fast_ms: 30,
            slow_ms: 200,
        },
        oscillator: OscillatorConfig {
            nominal_hz: 32_000,
            tolerance_pct: 60,
        },
        scan_timeout_wakes: 8,
        motion_hold_cycles: 50,
        telemetry: TelemetryMode::Summary,
        calibration_offset: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_valid() {
        let config = reference();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.threshold, 300);
        assert_eq!(config.weights.total(), 22);
    }

    #[test]
    fn test_rejects_bad_cadence() {
        let mut config = reference();
        config.cadence.fast_ms = 300;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCadence));

        config.cadence.fast_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCadence));
    }

    #[test]
    fn test_rejects_bad_oscillator() {
        let mut config = reference();
        config.oscillator.tolerance_pct = 100;
        assert_eq!(config.validate(), Err(ConfigError::InvalidOscillator));
    }

    #[test]
    fn test_rejects_nonpositive_scale() {
        let mut config = reference();
        config.scales[4] = Q8_8::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidScale { electrode: 4 })
        );
    }

    #[test]
    fn test_rejects_zero_weights() {
        let mut config = reference();
        config.weights = ElectrodeWeights::new([0; REFERENCE_ELECTRODES]);
        assert_eq!(config.validate(), Err(ConfigError::ZeroWeights));
    }

    #[test]
    fn test_rejects_zero_height() {
        let mut config = reference();
        config.max_height_mm = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroHeight));
    }
}
