//! State machine for the measurement cycle
//!
//! Defines the authoritative runtime behavior of the sensor.
//! The state machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{Fault, State};
