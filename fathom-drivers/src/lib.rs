//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in fathom-core for the sensor's front-end parts:
//!
//! - Capacitance-to-digital converters (MPR121)

#![no_std]
#![deny(unsafe_code)]

pub mod capsense;
