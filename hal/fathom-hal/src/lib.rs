//! Fathom Hardware Abstraction Layer
//!
//! This crate defines hardware abstraction traits that can be implemented
//! by chip-specific HALs. The level sensing core only ever talks to
//! persistent storage through these traits, so the same calibration code
//! runs against on-chip flash, an external EEPROM, or an in-memory mock.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (fathom-firmware)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  fathom-core (calibration store)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  fathom-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  fathom-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::RowStorage`] - Byte-addressable storage with row-granular writes

#![no_std]
#![deny(unsafe_code)]

pub mod flash;

pub use flash::{RowStorage, StorageError};
