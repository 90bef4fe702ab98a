//! Persistent storage abstractions
//!
//! Provides a trait for byte-addressable non-volatile storage that can only
//! be written a whole row at a time. On-chip flash (erase sector), emulated
//! EEPROM rows and external EEPROM pages all fit this model.

/// Errors from persistent storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Storage peripheral not present or not initialized
    Unavailable,
    /// Address range falls outside the storage region
    OutOfBounds,
    /// Read operation failed
    Read,
    /// Erase or program operation failed
    Write,
    /// Row data length does not match the row size
    RowLength,
}

/// Row-granular persistent storage
///
/// Reads may start at any byte offset. Writes replace exactly one row;
/// callers that want to change a few bytes must read the surrounding row,
/// patch it, and write it back.
///
/// Offsets are relative to the start of the region the implementation
/// manages, not absolute device addresses.
pub trait RowStorage {
    /// Total size of the storage region in bytes
    fn capacity(&self) -> u32;

    /// Size of one writable row in bytes
    fn row_size(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Replace the contents of row `row`
    ///
    /// `data.len()` must equal [`RowStorage::row_size`]. Atomicity on power
    /// loss is whatever the medium provides; a torn row is possible.
    fn write_row(&mut self, row: u32, data: &[u8]) -> Result<(), StorageError>;

    /// Number of rows in the region
    fn row_count(&self) -> u32 {
        let row = self.row_size() as u32;
        if row == 0 {
            0
        } else {
            self.capacity() / row
        }
    }
}
