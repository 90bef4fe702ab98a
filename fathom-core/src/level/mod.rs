//! Level estimation
//!
//! Turns one scan's raw electrode counts into a liquid level. See
//! [`estimate`] for the pipeline.

pub mod estimator;
pub mod weights;

pub use estimator::{estimate, process, EstimatorParams, Geometry, LevelMeasurement};
pub use weights::ElectrodeWeights;

/// Raw counts from one scan, one per electrode
pub type Readings<const N: usize> = [u16; N];

/// Raw counts observed with the vessel empty, one per electrode
pub type Offsets<const N: usize> = [i16; N];
