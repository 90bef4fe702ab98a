//! Host-side fakes of the hardware traits

use heapless::Vec;

use crate::config::ElectrodeTuning;
use crate::link::HostMessage;
use crate::telemetry::TelemetryRecord;
use crate::traits::{
    RowStorage, ScanEngine, ScanError, StorageError, Telemetry, TelemetryError, Transport,
    TransportError, WakeTimer,
};
use crate::wake::OscillatorMeasurement;

const MEM_CAPACITY: usize = 1024;

/// RAM-backed row storage, erased to `0xFF`
#[derive(Clone)]
pub struct MemStorage {
    data: [u8; MEM_CAPACITY],
    row_size: usize,
    rows: usize,
    pub rows_written: Vec<u32, 64>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MemStorage {
    /// Four rows of `row_size` bytes
    pub fn new(row_size: usize) -> Self {
        Self::with_rows(row_size, 4)
    }

    pub fn with_rows(row_size: usize, rows: usize) -> Self {
        assert!(row_size * rows <= MEM_CAPACITY);
        Self {
            data: [0xFF; MEM_CAPACITY],
            row_size,
            rows,
            rows_written: Vec::new(),
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.row_size * self.rows]
    }

    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Flip every bit of one byte
    pub fn corrupt(&mut self, index: usize) {
        self.data[index] ^= 0xFF;
    }
}

impl RowStorage for MemStorage {
    fn capacity(&self) -> u32 {
        (self.row_size * self.rows) as u32
    }

    fn row_size(&self) -> usize {
        self.row_size
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        if self.fail_reads {
            return Err(StorageError::Read);
        }
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.capacity() as usize {
            return Err(StorageError::OutOfBounds);
        }
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write_row(&mut self, row: u32, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Write);
        }
        if data.len() != self.row_size {
            return Err(StorageError::RowLength);
        }
        if row as usize >= self.rows {
            return Err(StorageError::OutOfBounds);
        }
        let start = row as usize * self.row_size;
        self.data[start..start + self.row_size].copy_from_slice(data);
        let _ = self.rows_written.push(row);
        Ok(())
    }
}

/// Scan engine that latches scripted readings when a scan completes
pub struct MockScanEngine<const N: usize> {
    /// Readings the next completed scan will report
    pub next: [u16; N],
    latched: [u16; N],
    running: bool,
    /// `is_busy` calls that still report busy
    remaining: u32,
    /// Busy polls each started scan takes
    pub busy_polls: u32,
    /// Never finish a scan
    pub stuck_busy: bool,
    pub fail: Option<ScanError>,
    pub fail_tuning: bool,
    pub scans_started: u32,
    pub tuned: Vec<(usize, ElectrodeTuning), 32>,
}

impl<const N: usize> MockScanEngine<N> {
    pub fn new() -> Self {
        Self {
            next: [0; N],
            latched: [0; N],
            running: false,
            remaining: 0,
            busy_polls: 0,
            stuck_busy: false,
            fail: None,
            fail_tuning: false,
            scans_started: 0,
            tuned: Vec::new(),
        }
    }

    /// Pretend a scan the controller did not request is in progress
    pub fn begin_external_scan(&mut self, busy_polls: u32) {
        self.running = true;
        self.remaining = busy_polls;
    }
}

impl<const N: usize> ScanEngine for MockScanEngine<N> {
    fn is_busy(&mut self) -> Result<bool, ScanError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        if self.stuck_busy {
            return Ok(true);
        }
        if !self.running {
            return Ok(false);
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(true);
        }
        self.running = false;
        self.latched = self.next;
        Ok(false)
    }

    fn read_raw(&mut self, electrode: usize) -> Result<u16, ScanError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        self.latched
            .get(electrode)
            .copied()
            .ok_or(ScanError::InvalidElectrode)
    }

    fn start_scan(&mut self) -> Result<(), ScanError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        self.running = true;
        self.remaining = self.busy_polls;
        self.scans_started += 1;
        Ok(())
    }

    fn apply_tuning(&mut self, electrode: usize, tuning: &ElectrodeTuning) -> Result<(), ScanError> {
        if self.fail_tuning {
            return Err(ScanError::Bus);
        }
        let _ = self.tuned.push((electrode, *tuning));
        Ok(())
    }
}

/// Transport that records what it was asked to send
pub struct MockTransport {
    pub sent: Vec<HostMessage, 32>,
    pub fail_with: Option<TransportError>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            fail_with: None,
        }
    }

    fn send(&mut self, msg: HostMessage) -> Result<(), TransportError> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        let _ = self.sent.push(msg);
        Ok(())
    }
}

impl Transport for MockTransport {
    fn notify(&mut self, level: u8) -> Result<(), TransportError> {
        self.send(HostMessage::Notify(level))
    }

    fn publish_notification_state(&mut self, enabled: bool) -> Result<(), TransportError> {
        self.send(HostMessage::NotificationState(enabled))
    }

    fn request_connection_parameters(&mut self) -> Result<(), TransportError> {
        self.send(HostMessage::RequestParameters)
    }
}

/// Wake timer with a fixed oscillator measurement
pub struct MockWakeTimer {
    pub measurement: OscillatorMeasurement,
    pub measurements: u32,
    pub armed: Vec<u32, 16>,
}

impl MockWakeTimer {
    pub fn new(measurement: OscillatorMeasurement) -> Self {
        Self {
            measurement,
            measurements: 0,
            armed: Vec::new(),
        }
    }
}

impl WakeTimer for MockWakeTimer {
    fn measure(&mut self) -> OscillatorMeasurement {
        self.measurements += 1;
        self.measurement
    }

    fn arm(&mut self, ticks: u32) {
        let _ = self.armed.push(ticks);
    }
}

/// Telemetry sink keeping the latest record
pub struct MockTelemetry {
    pub published: u32,
    pub last: Option<TelemetryRecord>,
    pub fail: Option<TelemetryError>,
}

impl MockTelemetry {
    pub fn new() -> Self {
        Self {
            published: 0,
            last: None,
            fail: None,
        }
    }
}

impl Telemetry for MockTelemetry {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        self.published += 1;
        self.last = Some(record.clone());
        Ok(())
    }
}
