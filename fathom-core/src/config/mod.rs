//! Sensor configuration
//!
//! Everything that differs between boards and vessels: scale factors, strip
//! geometry, scan tunables, timing. The firmware embeds one [`SensorConfig`]
//! generated at build time, so every type here is `const`-constructible.

pub mod sensor;
pub mod tuning;

pub use sensor::*;
pub use tuning::*;
