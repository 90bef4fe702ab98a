//! Data log records
//!
//! One record per cycle goes to the telemetry sink, framed with
//! [`wire::encode_frame`](crate::wire::encode_frame). How much a record
//! carries depends on [`TelemetryMode`].

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::config::MAX_ELECTRODES;
use crate::level::{LevelMeasurement, Readings};

/// How much to log each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryMode {
    /// No data log
    Off,
    /// Level only
    #[default]
    Summary,
    /// Level plus raw and processed counts of every electrode
    Full,
}

/// One cycle's data log entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    pub cycle: u32,
    /// Liquid height, 24.8 millimetres
    pub height: i32,
    /// Level, 24.8 percent
    pub percent: i32,
    pub active_weight: u16,
    /// Bit `i` set when electrode `i` is submerged
    pub submerged: u32,
    pub connected: bool,
    /// Empty in summary mode
    pub raw: Vec<u16, MAX_ELECTRODES>,
    /// Empty in summary mode
    pub processed: Vec<i32, MAX_ELECTRODES>,
}

impl TelemetryRecord {
    /// Build the record for `mode`, `None` when logging is off
    pub fn capture<const N: usize>(
        mode: TelemetryMode,
        cycle: u32,
        readings: &Readings<N>,
        measurement: &LevelMeasurement<N>,
        connected: bool,
    ) -> Option<Self> {
        let mut record = Self {
            cycle,
            height: measurement.height.to_bits(),
            percent: measurement.percent.to_bits(),
            active_weight: measurement.active_weight.min(u16::MAX as u32) as u16,
            submerged: measurement.submerged_mask(),
            connected,
            raw: Vec::new(),
            processed: Vec::new(),
        };

        match mode {
            TelemetryMode::Off => return None,
            TelemetryMode::Summary => {}
            TelemetryMode::Full => {
                record.raw = readings.iter().take(MAX_ELECTRODES).copied().collect();
                record.processed = measurement
                    .processed
                    .iter()
                    .take(MAX_ELECTRODES)
                    .copied()
                    .collect();
            }
        }

        Some(record)
    }

    /// Whole percent
    pub fn percent_whole(&self) -> i32 {
        self.percent >> 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Q24_8;
    use crate::wire::{decode_frame, encode_frame, MAX_FRAME_LEN};

    fn measurement() -> LevelMeasurement<4> {
        let mut m = LevelMeasurement::empty();
        m.processed = [512, 40, -3, 0];
        m.submerged = [true, false, false, false];
        m.active_weight = 1;
        m.height = Q24_8::from_bits(1780);
        m.percent = Q24_8::from_bits(1163);
        m
    }

    #[test]
    fn test_off_mode_yields_nothing() {
        let r = TelemetryRecord::capture(TelemetryMode::Off, 1, &[0; 4], &measurement(), false);
        assert!(r.is_none());
    }

    #[test]
    fn test_summary_omits_counts() {
        let r = TelemetryRecord::capture(TelemetryMode::Summary, 9, &[700, 40, 1, 0], &measurement(), true)
            .unwrap();
        assert_eq!(r.cycle, 9);
        assert_eq!(r.percent_whole(), 4);
        assert_eq!(r.submerged, 0b0001);
        assert!(r.connected);
        assert!(r.raw.is_empty());
        assert!(r.processed.is_empty());
    }

    #[test]
    fn test_full_carries_counts() {
        let r = TelemetryRecord::capture(TelemetryMode::Full, 2, &[700, 40, 1, 0], &measurement(), false)
            .unwrap();
        assert_eq!(r.raw.as_slice(), &[700, 40, 1, 0]);
        assert_eq!(r.processed.as_slice(), &[512, 40, -3, 0]);
    }

    #[test]
    fn test_full_record_fits_frame() {
        let readings = [u16::MAX; MAX_ELECTRODES];
        let mut m = LevelMeasurement::<MAX_ELECTRODES>::empty();
        m.processed = [i32::MIN; MAX_ELECTRODES];
        m.height = Q24_8::from_bits(i32::MAX);
        m.percent = Q24_8::from_bits(i32::MAX);
        let record = TelemetryRecord::capture(TelemetryMode::Full, u32::MAX, &readings, &m, true).unwrap();

        let mut buf = [0u8; MAX_FRAME_LEN];
        let frame = encode_frame(&record, &mut buf).unwrap();
        let decoded: TelemetryRecord = decode_frame(frame).unwrap();
        assert_eq!(decoded, record);
    }
}
