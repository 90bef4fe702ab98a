//! RP2040-specific HAL for the level sensor firmware
//!
//! This crate provides RP2040-specific implementations of the shared
//! `fathom-hal` and `fathom-core` traits:
//!
//! - Calibration storage in the last flash sector (implements
//!   `fathom_hal::RowStorage`)
//! - Ring-oscillator wake timer with frequency-counter measurement
//!   (implements `fathom_core::traits::WakeTimer`)

#![no_std]

pub mod flash;
pub mod wake;

pub use flash::Rp2040RowStorage;
pub use wake::{RoscWakeTimer, WakePeriod};
