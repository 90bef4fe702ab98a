//! Raw counts to liquid level
//!
//! The estimator is a pure function of the current readings, the stored
//! empty offsets and the static sensor parameters. It keeps no state of its
//! own; the controller lends it everything by reference each cycle.

use crate::config::ConfigError;
use crate::fixed::{Q24_8, Q8_8};

use super::weights::ElectrodeWeights;
use super::{Offsets, Readings};

/// Vertical layout of the electrode strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    max_height_mm: u16,
    max_height: Q24_8,
    electrode_height: Q24_8,
}

impl Geometry {
    /// Electrodes spread evenly from the bottom (0 mm) to `max_height_mm`
    pub fn uniform(max_height_mm: u16, electrodes: usize) -> Result<Self, ConfigError> {
        if max_height_mm == 0 {
            return Err(ConfigError::ZeroHeight);
        }
        if electrodes < 2 {
            return Err(ConfigError::TooFewElectrodes);
        }

        let max_height = Q24_8::from_int(max_height_mm as i32);
        let electrode_height = Q24_8::from_bits(max_height.to_bits() / (electrodes as i32 - 1));

        Ok(Self {
            max_height_mm,
            max_height,
            electrode_height,
        })
    }

    pub const fn max_height_mm(&self) -> u16 {
        self.max_height_mm
    }

    pub const fn max_height(&self) -> Q24_8 {
        self.max_height
    }

    /// Distance between adjacent electrodes
    pub const fn electrode_height(&self) -> Q24_8 {
        self.electrode_height
    }

    /// Heights above this snap to the maximum
    pub fn clamp_threshold(&self) -> Q24_8 {
        self.max_height - self.electrode_height.quarter()
    }

    /// Height for a submerged weight in half-pitch units
    ///
    /// Truncation in `electrode_height` leaves a full strip a few LSBs short
    /// of the maximum, so anything within a quarter pitch of the top is
    /// reported as exactly full.
    pub fn height(&self, active_weight: u32) -> Q24_8 {
        let height = self.electrode_height.half().mul_int(active_weight as i32);
        if height > self.clamp_threshold() {
            self.max_height
        } else {
            height
        }
    }

    /// Height as a percentage of the maximum, in 24.8
    pub fn percent(&self, height: Q24_8) -> Q24_8 {
        let scaled = height.to_bits() as i64 * 100 / self.max_height_mm as i64;
        Q24_8::from_bits(scaled as i32)
    }
}

/// Static per-device inputs to [`estimate`]
#[derive(Debug, Clone, Copy)]
pub struct EstimatorParams<'a, const N: usize> {
    pub scales: &'a [Q8_8; N],
    pub weights: &'a ElectrodeWeights<N>,
    pub geometry: Geometry,
    /// A processed value strictly above this marks the electrode submerged
    pub threshold: i32,
}

/// Result of one estimation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LevelMeasurement<const N: usize> {
    /// Offset-corrected, scaled count per electrode
    pub processed: [i32; N],
    pub submerged: [bool; N],
    /// Sum of the weights of submerged electrodes
    pub active_weight: u32,
    /// Liquid height in millimetres
    pub height: Q24_8,
    /// Liquid height in percent of the strip
    pub percent: Q24_8,
}

impl<const N: usize> LevelMeasurement<N> {
    /// Dry strip
    pub const fn empty() -> Self {
        Self {
            processed: [0; N],
            submerged: [false; N],
            active_weight: 0,
            height: Q24_8::ZERO,
            percent: Q24_8::ZERO,
        }
    }

    /// Whole percent, saturated into one byte
    pub fn percent_byte(&self) -> u8 {
        self.percent.whole().clamp(0, u8::MAX as i32) as u8
    }

    /// Submerged electrodes as a bitmask, bit `i` for electrode `i`
    ///
    /// Electrodes past the 32nd are not represented.
    pub fn submerged_mask(&self) -> u32 {
        self.submerged
            .iter()
            .take(32)
            .enumerate()
            .filter(|(_, wet)| **wet)
            .fold(0, |mask, (i, _)| mask | (1u32 << i))
    }
}

impl<const N: usize> Default for LevelMeasurement<N> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Offset-correct and scale one reading
pub fn process(reading: u16, offset: i16, scale: Q8_8) -> i32 {
    let diff = reading as i32 - offset as i32;
    scale.apply(diff)
}

/// Compute the liquid level from one set of readings
pub fn estimate<const N: usize>(
    readings: &Readings<N>,
    offsets: &Offsets<N>,
    params: &EstimatorParams<'_, N>,
) -> LevelMeasurement<N> {
    let mut measurement = LevelMeasurement::empty();

    for i in 0..N {
        let value = process(readings[i], offsets[i], params.scales[i]);
        measurement.processed[i] = value;
        if value > params.threshold {
            measurement.submerged[i] = true;
            measurement.active_weight += params.weights.get(i) as u32;
        }
    }

    measurement.height = params.geometry.height(measurement.active_weight);
    measurement.percent = params.geometry.percent(measurement.height);
    measurement
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const N: usize = 12;
    const THRESHOLD: i32 = 300;

    fn reference_scales() -> [Q8_8; N] {
        let mut scales = [Q8_8::ONE; N];
        scales[0] = Q8_8::from_bits(0x01D0);
        scales[N - 1] = Q8_8::from_bits(0x01C0);
        scales
    }

    fn run(readings: &[u16; N], offsets: &[i16; N], scales: &[Q8_8; N]) -> LevelMeasurement<N> {
        let weights = ElectrodeWeights::uniform();
        let params = EstimatorParams {
            scales,
            weights: &weights,
            geometry: Geometry::uniform(153, N).unwrap(),
            threshold: THRESHOLD,
        };
        estimate(readings, offsets, &params)
    }

    #[test]
    fn test_geometry_reference() {
        let geometry = Geometry::uniform(153, N).unwrap();
        assert_eq!(geometry.max_height().to_bits(), 39168);
        assert_eq!(geometry.electrode_height().to_bits(), 3560);
        assert_eq!(geometry.clamp_threshold().to_bits(), 39168 - 890);
    }

    #[test]
    fn test_geometry_rejects_degenerate() {
        assert_eq!(Geometry::uniform(0, N), Err(ConfigError::ZeroHeight));
        assert_eq!(Geometry::uniform(153, 1), Err(ConfigError::TooFewElectrodes));
    }

    #[test]
    fn test_dry_strip_reads_zero() {
        let m = run(&[0; N], &[0; N], &reference_scales());
        assert_eq!(m.active_weight, 0);
        assert_eq!(m.height, Q24_8::ZERO);
        assert_eq!(m.percent, Q24_8::ZERO);
        assert_eq!(m.submerged_mask(), 0);
    }

    #[test]
    fn test_readings_at_offsets_read_zero() {
        let offsets = [0, 1486, 1864, 2563, 2680, 1892, 1905, 1825, 1904, 2024, 2086, 884];
        let readings = offsets.map(|o| o as u16);
        let m = run(&readings, &offsets, &reference_scales());
        assert_eq!(m.processed, [0; N]);
        assert_eq!(m.active_weight, 0);
        assert_eq!(m.percent_byte(), 0);
    }

    #[test]
    fn test_bottom_electrode_only() {
        let mut readings = [0; N];
        readings[0] = 400;
        let m = run(&readings, &[0; N], &reference_scales());
        assert_eq!(m.processed[0], 725);
        assert_eq!(m.active_weight, 1);
        assert_eq!(m.height.to_bits(), 1780);
        assert_eq!(m.percent.to_bits(), 1163);
        assert_eq!(m.percent_byte(), 4);
        assert_eq!(m.submerged_mask(), 0b1);
    }

    #[test]
    fn test_single_interior_electrode() {
        let mut readings = [0; N];
        readings[6] = 301;
        let m = run(&readings, &[0; N], &reference_scales());
        assert_eq!(m.active_weight, 2);
        assert_eq!(m.height.to_bits(), 3560);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut readings = [0; N];
        readings[6] = 300;
        let m = run(&readings, &[0; N], &reference_scales());
        assert_eq!(m.processed[6], 300);
        assert!(!m.submerged[6]);
        assert_eq!(m.active_weight, 0);
    }

    #[test]
    fn test_full_strip_clamps() {
        let m = run(&[600; N], &[0; N], &reference_scales());
        assert_eq!(m.active_weight, 22);
        assert_eq!(m.height.to_bits(), 39168);
        assert_eq!(m.percent.to_bits(), 25600);
        assert_eq!(m.percent_byte(), 100);
    }

    #[test]
    fn test_one_short_of_full_not_clamped() {
        let mut readings = [600; N];
        readings[N - 1] = 0;
        let m = run(&readings, &[0; N], &reference_scales());
        assert_eq!(m.active_weight, 21);
        assert_eq!(m.height.to_bits(), 21 * 1780);
        assert_eq!(m.percent_byte(), 95);
    }

    #[test]
    fn test_negative_difference() {
        let mut offsets = [0; N];
        offsets[3] = 2000;
        let m = run(&[100; N], &offsets, &reference_scales());
        assert_eq!(m.processed[3], -1900);
        assert!(!m.submerged[3]);
    }

    #[test]
    fn test_process_truncates_toward_negative_infinity() {
        assert_eq!(process(0, 1, Q8_8::from_bits(0x0080)), -1);
        assert_eq!(process(2, 0, Q8_8::from_bits(0x0080)), 1);
    }

    proptest! {
        #[test]
        fn test_weight_monotonic_in_each_reading(
            readings in prop::array::uniform12(any::<u16>()),
            offsets in prop::array::uniform12(any::<i16>()),
            scale_bits in prop::array::uniform12(1i16..=i16::MAX),
            index in 0usize..N,
            bump in 1u16..=u16::MAX,
        ) {
            let scales = scale_bits.map(Q8_8::from_bits);
            let before = run(&readings, &offsets, &scales);

            let mut raised = readings;
            raised[index] = raised[index].saturating_add(bump);
            let after = run(&raised, &offsets, &scales);

            prop_assert!(after.active_weight >= before.active_weight);
            prop_assert!(after.height >= before.height);
        }

        #[test]
        fn test_percent_never_exceeds_hundred(
            readings in prop::array::uniform12(any::<u16>()),
        ) {
            let m = run(&readings, &[0; N], &reference_scales());
            prop_assert!(m.percent_byte() <= 100);
        }
    }
}
