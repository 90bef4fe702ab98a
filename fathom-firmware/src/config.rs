//! Sensor configuration compiled from sensor.toml
//!
//! `build.rs` validates sensor.toml and generates the constants included
//! here. The controller validates [`SENSOR`] again at boot.

use fathom_core::config::{ScanTuning, SensorConfig};
use fathom_core::fixed::Q8_8;
use fathom_core::level::ElectrodeWeights;
use fathom_core::telemetry::TelemetryMode;
use fathom_core::wake::{CadenceConfig, OscillatorConfig};
use fathom_drivers::capsense::mpr121::{FirstFilter, Mpr121Config, SecondFilter};

include!(concat!(env!("OUT_DIR"), "/sensor_config.rs"));
