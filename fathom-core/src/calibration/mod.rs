//! Electrode calibration
//!
//! Each electrode reads a non-zero count with the vessel empty. Those counts
//! are captured once on request, stored persistently, and subtracted from
//! every later reading.

pub mod record;
pub mod store;

pub use record::{crc32, CalibrationRecord, RecordError, CALIBRATION_MAGIC, CALIBRATION_VERSION};
pub use store::{
    Calibration, CalibrationError, CalibrationStore, LoadError, LoadOutcome, MAX_ROW_SIZE,
};
