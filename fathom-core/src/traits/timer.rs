//! Low-power wake timer trait

use crate::wake::OscillatorMeasurement;

/// Trait for the timer that ends a sleep
///
/// The timer counts low-frequency oscillator ticks and raises
/// [`Signals::WAKE`](crate::signals::Signals::WAKE) on every match, then
/// starts over. It keeps running with the last match value until re-armed.
pub trait WakeTimer {
    /// Count oscillator cycles against the reference clock
    fn measure(&mut self) -> OscillatorMeasurement;

    /// Replace the match value
    fn arm(&mut self, ticks: u32);
}
