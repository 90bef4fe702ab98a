//! Hardware abstraction traits
//!
//! These traits define the interface between the controller and the
//! board-specific peripherals around it. Persistent storage lives in
//! `fathom-hal` since the HAL crates implement it directly.

pub mod scan;
pub mod telemetry;
pub mod timer;
pub mod transport;

pub use fathom_hal::{RowStorage, StorageError};
pub use scan::{ElectrodeTuning, ScanEngine, ScanError};
pub use telemetry::{Telemetry, TelemetryError};
pub use timer::WakeTimer;
pub use transport::{Transport, TransportError};
