//! Flash storage driver for RP2040
//!
//! Calibration lives in the last erase sector of the external QSPI flash.
//! One sector is one row: writing a row erases the sector and programs it
//! again, so the sector must be kept out of the firmware image (see
//! `memory.x`).
//!
//! Implements the `RowStorage` trait from `fathom-hal`.

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

pub use fathom_hal::flash::{RowStorage, StorageError};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico
pub const CALIBRATION_SECTORS: usize = 1;
pub const CALIBRATION_PARTITION_SIZE: usize = CALIBRATION_SECTORS * ERASE_SIZE;
pub const CALIBRATION_PARTITION_START: usize = FLASH_SIZE - CALIBRATION_PARTITION_SIZE;

/// RP2040 flash rows for calibration data
pub struct Rp2040RowStorage<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> Rp2040RowStorage<'d> {
    /// Create a new flash storage instance
    pub fn new(flash: Peri<'d, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }

    fn absolute(offset: u32) -> u32 {
        CALIBRATION_PARTITION_START as u32 + offset
    }
}

impl RowStorage for Rp2040RowStorage<'_> {
    fn capacity(&self) -> u32 {
        CALIBRATION_PARTITION_SIZE as u32
    }

    fn row_size(&self) -> usize {
        ERASE_SIZE
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        let end = offset as usize + buf.len();
        if end > CALIBRATION_PARTITION_SIZE {
            return Err(StorageError::OutOfBounds);
        }
        self.flash
            .blocking_read(Self::absolute(offset), buf)
            .map_err(|_| StorageError::Read)
    }

    fn write_row(&mut self, row: u32, data: &[u8]) -> Result<(), StorageError> {
        if data.len() != ERASE_SIZE {
            return Err(StorageError::RowLength);
        }
        if row as usize >= CALIBRATION_SECTORS {
            return Err(StorageError::OutOfBounds);
        }

        let start = Self::absolute(row * ERASE_SIZE as u32);
        self.flash
            .blocking_erase(start, start + ERASE_SIZE as u32)
            .map_err(|_| StorageError::Write)?;
        self.flash
            .blocking_write(start, data)
            .map_err(|_| StorageError::Write)
    }
}
