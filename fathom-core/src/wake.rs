//! Wake timer cadence and calibration
//!
//! The sleep timer runs from a low-frequency oscillator that is only
//! accurate to tens of percent. Before a new period is armed, the board
//! counts oscillator cycles against a precise reference clock and the match
//! value is derived from the measured rate instead of the datasheet one.

use crate::traits::WakeTimer;

/// How often the device wakes to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cadence {
    /// Short period while a client is connected or the vessel was moved
    Fast,
    /// Long period otherwise
    Slow,
}

/// Sleep period per cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CadenceConfig {
    pub fast_ms: u16,
    pub slow_ms: u16,
}

impl CadenceConfig {
    pub const fn period_ms(&self, cadence: Cadence) -> u16 {
        match cadence {
            Cadence::Fast => self.fast_ms,
            Cadence::Slow => self.slow_ms,
        }
    }

    pub const fn period_us(&self, cadence: Cadence) -> u32 {
        self.period_ms(cadence) as u32 * 1000
    }
}

/// Expected behaviour of the low-frequency oscillator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OscillatorConfig {
    pub nominal_hz: u32,
    /// Allowed deviation from nominal, in percent
    pub tolerance_pct: u8,
}

impl OscillatorConfig {
    pub const fn min_hz(&self) -> u32 {
        (self.nominal_hz as u64 * (100 - self.tolerance_pct as u64) / 100) as u32
    }

    pub const fn max_hz(&self) -> u32 {
        (self.nominal_hz as u64 * (100 + self.tolerance_pct as u64) / 100) as u32
    }

    pub const fn accepts(&self, hz: u32) -> bool {
        hz >= self.min_hz() && hz <= self.max_hz()
    }
}

/// Oscillator cycles counted over a window of reference clock cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OscillatorMeasurement {
    pub oscillator_cycles: u32,
    pub reference_cycles: u32,
    pub reference_hz: u32,
}

impl OscillatorMeasurement {
    /// Measurement from an already known frequency
    pub const fn from_hz(hz: u32) -> Self {
        Self {
            oscillator_cycles: hz,
            reference_cycles: 1_000_000,
            reference_hz: 1_000_000,
        }
    }

    /// Measured oscillator frequency, `None` for an empty window
    pub fn frequency_hz(&self) -> Option<u32> {
        if self.reference_cycles == 0 {
            return None;
        }
        let hz = self.oscillator_cycles as u64 * self.reference_hz as u64
            / self.reference_cycles as u64;
        u32::try_from(hz).ok()
    }
}

/// Wake timer calibration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeError {
    /// The reference window was empty
    NoReference,
    /// Measured rate outside nominal ± tolerance
    OutOfTolerance { measured_hz: u32 },
}

/// Converts sleep periods into oscillator ticks
#[derive(Debug, Clone, Copy)]
pub struct WakeCalibrator {
    config: OscillatorConfig,
}

impl WakeCalibrator {
    pub const fn new(config: OscillatorConfig) -> Self {
        Self { config }
    }

    /// Ticks for `delay_us` at the nominal rate
    pub fn nominal_ticks(&self, delay_us: u32) -> u32 {
        ticks_at(self.config.nominal_hz, delay_us)
    }

    /// Ticks for `delay_us` at the measured rate
    pub fn ticks_for(
        &self,
        delay_us: u32,
        measurement: &OscillatorMeasurement,
    ) -> Result<u32, WakeError> {
        let hz = measurement.frequency_hz().ok_or(WakeError::NoReference)?;
        if !self.config.accepts(hz) {
            return Err(WakeError::OutOfTolerance { measured_hz: hz });
        }
        Ok(ticks_at(hz, delay_us))
    }
}

fn ticks_at(hz: u32, delay_us: u32) -> u32 {
    let ticks = hz as u64 * delay_us as u64 / 1_000_000;
    ticks.clamp(1, u32::MAX as u64) as u32
}

/// What a re-arm did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeArm {
    pub cadence: Cadence,
    pub period_ms: u16,
    /// Match value handed to the timer
    pub ticks: u32,
    /// Set when the measurement was rejected and nominal ticks were used
    pub error: Option<WakeError>,
}

/// Tracks the period currently armed on the wake timer
#[derive(Debug, Clone, Copy, Default)]
pub struct WakeSchedule {
    armed: Option<Cadence>,
}

impl WakeSchedule {
    pub const fn new() -> Self {
        Self { armed: None }
    }

    pub const fn armed(&self) -> Option<Cadence> {
        self.armed
    }

    /// Arm `cadence` unless it is already armed
    ///
    /// Returns `None` when the timer was left alone.
    pub fn select<W: WakeTimer>(
        &mut self,
        cadence: Cadence,
        periods: &CadenceConfig,
        calibrator: &WakeCalibrator,
        timer: &mut W,
    ) -> Option<WakeArm> {
        if self.armed == Some(cadence) {
            return None;
        }

        let period_us = periods.period_us(cadence);
        let measurement = timer.measure();
        let (ticks, error) = match calibrator.ticks_for(period_us, &measurement) {
            Ok(ticks) => (ticks, None),
            Err(e) => (calibrator.nominal_ticks(period_us), Some(e)),
        };

        timer.arm(ticks);
        self.armed = Some(cadence);

        Some(WakeArm {
            cadence,
            period_ms: periods.period_ms(cadence),
            ticks,
            error,
        })
    }
}
