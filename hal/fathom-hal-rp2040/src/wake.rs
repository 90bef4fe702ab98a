//! Ring-oscillator wake timer
//!
//! The sleep timer ticks at the ring oscillator (ROSC) divided down to
//! roughly 32 kHz. The ROSC drifts with voltage and temperature, so the
//! core measures it against `clk_ref` (crystal) with the clock block's
//! frequency counter before choosing a match value.
//!
//! Matches are delivered through a [`WakePeriod`] signal: the wake task in
//! the firmware owns the actual countdown and raises the wake flag each time
//! it expires.

use embassy_rp::clocks::clk_ref_freq;
use embassy_rp::pac;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Duration;

use fathom_core::traits::WakeTimer;
use fathom_core::wake::OscillatorMeasurement;

/// ROSC prescaler feeding the wake counter
pub const WAKE_DIVIDER: u32 = 200;

/// Frequency counter result fraction bits (1/32 kHz)
const FC_FRAC_BITS: u32 = 5;

/// Frequency counter interval, `2^n` reference cycles at 1 MHz-ish
const FC_INTERVAL: u8 = 10;

/// Period handed from the timer to the wake task
pub type WakePeriod = Signal<CriticalSectionRawMutex, Duration>;

/// [`WakeTimer`] clocked by the divided ROSC
pub struct RoscWakeTimer<'a> {
    period: &'a WakePeriod,
    /// Last measured wake clock rate
    tick_hz: u32,
}

impl<'a> RoscWakeTimer<'a> {
    /// Create a timer that assumes `nominal_hz` until the first measurement
    pub fn new(period: &'a WakePeriod, nominal_hz: u32) -> Self {
        Self {
            period,
            tick_hz: nominal_hz.max(1),
        }
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }
}

/// Count the ROSC against `clk_ref`, result in 1/32 kHz units
fn count_rosc() -> u32 {
    let clocks = pac::CLOCKS;
    while clocks.fc0_status().read().running() {}

    clocks
        .fc0_ref_khz()
        .write(|w| w.set_fc0_ref_khz(clk_ref_freq() / 1000));
    clocks
        .fc0_interval()
        .write(|w| w.set_fc0_interval(FC_INTERVAL));
    clocks.fc0_min_khz().write(|w| w.set_fc0_min_khz(0));
    clocks
        .fc0_max_khz()
        .write(|w| w.set_fc0_max_khz(0x01FF_FFFF));
    clocks
        .fc0_src()
        .write(|w| w.set_fc0_src(pac::clocks::vals::Fc0src::ROSC_CLKSRC));

    while !clocks.fc0_status().read().done() {}

    let result = clocks.fc0_result().read();
    (result.khz() as u32) << FC_FRAC_BITS | result.frac() as u32
}

impl WakeTimer for RoscWakeTimer<'_> {
    fn measure(&mut self) -> OscillatorMeasurement {
        let counted = count_rosc();
        let measurement = OscillatorMeasurement {
            oscillator_cycles: counted,
            reference_cycles: WAKE_DIVIDER << FC_FRAC_BITS,
            reference_hz: 1000,
        };
        if let Some(hz) = measurement.frequency_hz() {
            self.tick_hz = hz.max(1);
        }
        measurement
    }

    fn arm(&mut self, ticks: u32) {
        // The counter runs at the real ROSC rate whatever the match value
        // was computed from
        let us = ticks as u64 * 1_000_000 / self.tick_hz as u64;
        self.period.signal(Duration::from_micros(us));
    }
}
