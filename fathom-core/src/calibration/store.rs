//! Calibration persistence
//!
//! [`CalibrationStore`] is the only code that touches persistent storage.
//! [`Calibration`] holds the offsets in RAM and remembers whether a capture
//! still has to be written.

use fathom_hal::{RowStorage, StorageError};

use crate::level::{Offsets, Readings};

use super::record::{CalibrationRecord, RecordError};

/// Largest storage row the store can patch (one RP2040 flash sector)
pub const MAX_ROW_SIZE: usize = 4096;

/// Errors from writing calibration data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Target range outside the storage region, or unusable row size
    BadParameter,
    /// Storage read or write failed
    Storage(StorageError),
    /// Captured count does not fit a stored offset
    OutOfRange { electrode: u8 },
}

impl From<StorageError> for CalibrationError {
    fn from(e: StorageError) -> Self {
        CalibrationError::Storage(e)
    }
}

/// Why a load fell back to zero offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Record would extend past the storage region
    OutOfRange,
    Storage(StorageError),
    Record(RecordError),
}

/// Result of reading calibration at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadOutcome {
    Loaded,
    /// Running uncalibrated on zero offsets
    Defaulted(LoadError),
}

/// Reads and writes the calibration record at a fixed storage offset
pub struct CalibrationStore<S> {
    storage: S,
    offset: u32,
}

impl<S: RowStorage> CalibrationStore<S> {
    pub fn new(storage: S, offset: u32) -> Self {
        Self { storage, offset }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Read the stored offsets, or zeros if there are none usable
    pub fn load<const N: usize>(&mut self) -> (Offsets<N>, LoadOutcome) {
        match self.try_load() {
            Ok(offsets) => (offsets, LoadOutcome::Loaded),
            Err(e) => ([0; N], LoadOutcome::Defaulted(e)),
        }
    }

    fn try_load<const N: usize>(&mut self) -> Result<Offsets<N>, LoadError> {
        let len = CalibrationRecord::<N>::ENCODED_LEN;
        let end = self.offset as u64 + len as u64;
        if end > self.storage.capacity() as u64 {
            return Err(LoadError::OutOfRange);
        }

        let mut buf = [0u8; MAX_RECORD_LEN];
        let buf = buf.get_mut(..len).ok_or(LoadError::OutOfRange)?;
        self.storage
            .read(self.offset, buf)
            .map_err(LoadError::Storage)?;

        CalibrationRecord::<N>::decode(buf)
            .map(|r| r.offsets)
            .map_err(LoadError::Record)
    }

    /// Write `offsets` as a fresh record
    pub fn persist<const N: usize>(&mut self, offsets: &Offsets<N>) -> Result<(), CalibrationError> {
        let mut buf = [0u8; MAX_RECORD_LEN];
        let len = CalibrationRecord::new(*offsets)
            .encode(&mut buf)
            .ok_or(CalibrationError::BadParameter)?;
        self.write_bytes(self.offset, &buf[..len])
    }

    /// Overwrite `data.len()` bytes at `offset`, preserving everything else
    ///
    /// Each row the range touches is read, patched and written back. Rows
    /// whose contents would not change are skipped. A power loss between
    /// two row writes leaves the range half old and half new.
    pub fn write_bytes(&mut self, offset: u32, data: &[u8]) -> Result<(), CalibrationError> {
        let end = offset as u64 + data.len() as u64;
        if end > self.storage.capacity() as u64 {
            return Err(CalibrationError::BadParameter);
        }

        let row_size = self.storage.row_size();
        if row_size == 0 || row_size > MAX_ROW_SIZE {
            return Err(CalibrationError::BadParameter);
        }

        let mut scratch = [0u8; MAX_ROW_SIZE];
        let row_buf = &mut scratch[..row_size];
        let mut written = 0;

        while written < data.len() {
            let addr = offset + written as u32;
            let row = addr / row_size as u32;
            let row_start = row * row_size as u32;
            let in_row = (addr - row_start) as usize;
            let chunk = (row_size - in_row).min(data.len() - written);
            let patch = &data[written..written + chunk];

            self.storage.read(row_start, row_buf)?;
            if &row_buf[in_row..in_row + chunk] != patch {
                row_buf[in_row..in_row + chunk].copy_from_slice(patch);
                self.storage.write_row(row, row_buf)?;
            }

            written += chunk;
        }

        Ok(())
    }
}

impl<S> CalibrationStore<S> {
    /// Give back the storage
    pub fn into_inner(self) -> S {
        self.storage
    }
}

/// Largest encoded record for any supported electrode count
const MAX_RECORD_LEN: usize = CalibrationRecord::<{ crate::config::MAX_ELECTRODES }>::ENCODED_LEN;

/// Offsets in use plus a pending-write marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration<const N: usize> {
    offsets: Offsets<N>,
    pending: bool,
}

impl<const N: usize> Calibration<N> {
    pub const fn new(offsets: Offsets<N>) -> Self {
        Self {
            offsets,
            pending: false,
        }
    }

    pub const fn offsets(&self) -> &Offsets<N> {
        &self.offsets
    }

    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Take `readings` as the new empty baseline and schedule a write
    ///
    /// A count above `i16::MAX` rejects the whole capture and leaves the
    /// offsets in use untouched.
    pub fn capture(&mut self, readings: &Readings<N>) -> Result<(), CalibrationError> {
        let mut offsets = [0i16; N];
        for (i, (offset, &reading)) in offsets.iter_mut().zip(readings.iter()).enumerate() {
            *offset = i16::try_from(reading)
                .map_err(|_| CalibrationError::OutOfRange { electrode: i as u8 })?;
        }
        self.offsets = offsets;
        self.pending = true;
        Ok(())
    }

    /// Write a pending capture
    ///
    /// Returns `None` when nothing was pending. The pending mark is cleared
    /// either way; a failed write is not retried.
    pub fn flush<S: RowStorage>(
        &mut self,
        store: &mut CalibrationStore<S>,
    ) -> Option<Result<(), CalibrationError>> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(store.persist(&self.offsets))
    }
}
