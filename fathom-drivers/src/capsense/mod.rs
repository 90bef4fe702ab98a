//! Capacitance-to-digital front ends

pub mod mpr121;
pub mod scanner;

pub use mpr121::{Mpr121, Mpr121Config, Mpr121Error};
pub use scanner::Mpr121Scanner;

/// Monotonic microsecond clock used to time conversions
pub trait Clock {
    fn now_us(&self) -> u64;
}
