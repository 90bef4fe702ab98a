//! Board-agnostic core logic for the liquid-level sensor firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Fixed-point types and the level estimator
//! - Electrode calibration and its persistent record
//! - State machine and controller for the scan/sleep cycle
//! - Wake timer calibration
//! - Radio link bookkeeping and telemetry records
//! - Hardware abstraction traits (scan engine, transport, timer)
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod calibration;
pub mod config;
pub mod controller;
pub mod fixed;
pub mod level;
pub mod link;
pub mod signals;
pub mod state;
pub mod telemetry;
pub mod traits;
pub mod wake;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{CycleReport, LevelController, Peripherals, Step, WaitFor};
