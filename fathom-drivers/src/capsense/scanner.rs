//! Single-shot scans on top of the MPR121's free-running mode
//!
//! The MPR121 has no "scan once" command. A scan enters Run Mode, waits out
//! the filter settle time, latches the filtered data and returns to Stop
//! Mode so the next cycle can retune and the part draws no current while
//! the sensor sleeps.
//!
//! The MPR121 reports a lower count for a bigger capacitance. Latched counts
//! are flipped against full scale so that liquid next to an electrode reads
//! higher, like every other scan engine.

use embedded_hal::i2c::I2c;

use fathom_core::config::ElectrodeTuning;
use fathom_core::traits::{ScanEngine, ScanError};

use super::mpr121::{ChargeSettings, Mpr121, Mpr121Error, ELECTRODES, FULL_SCALE};
use super::Clock;

/// [`ScanEngine`] backed by an MPR121
pub struct Mpr121Scanner<I2C, C> {
    device: Mpr121<I2C>,
    clock: C,
    /// Completion time of the running scan
    deadline: Option<u64>,
    latched: [u16; ELECTRODES],
}

impl<I2C: I2c, C: Clock> Mpr121Scanner<I2C, C> {
    /// Wrap an initialized device
    pub fn new(device: Mpr121<I2C>, clock: C) -> Self {
        Self {
            device,
            clock,
            deadline: None,
            latched: [0; ELECTRODES],
        }
    }

    pub fn device(&self) -> &Mpr121<I2C> {
        &self.device
    }

    /// Time left on the running scan
    pub fn remaining_us(&self) -> Option<u64> {
        self.deadline
            .map(|deadline| deadline.saturating_sub(self.clock.now_us()))
    }

    /// Latch the results and stop the part
    fn finish(&mut self) -> Result<(), ScanError> {
        self.deadline = None;
        let enabled = (self.device.config().electrodes as usize).min(ELECTRODES);
        let read = self.device.read_filtered(&mut self.latched[..enabled]);
        self.device.stop().map_err(bus_error)?;
        read.map_err(bus_error)?;

        for count in &mut self.latched[..enabled] {
            *count = FULL_SCALE - (*count).min(FULL_SCALE);
        }
        Ok(())
    }
}

fn bus_error<E>(e: Mpr121Error<E>) -> ScanError {
    match e {
        Mpr121Error::InvalidElectrode => ScanError::InvalidElectrode,
        _ => ScanError::Bus,
    }
}

impl<I2C: I2c, C: Clock> ScanEngine for Mpr121Scanner<I2C, C> {
    fn is_busy(&mut self) -> Result<bool, ScanError> {
        match self.deadline {
            Some(deadline) if self.clock.now_us() < deadline => Ok(true),
            Some(_) => self.finish().map(|()| false),
            None => Ok(false),
        }
    }

    fn read_raw(&mut self, electrode: usize) -> Result<u16, ScanError> {
        if electrode >= self.device.config().electrodes as usize {
            return Err(ScanError::InvalidElectrode);
        }
        self.latched
            .get(electrode)
            .copied()
            .ok_or(ScanError::InvalidElectrode)
    }

    fn start_scan(&mut self) -> Result<(), ScanError> {
        self.device.start().map_err(bus_error)?;
        let settle = u64::from(self.device.config().settle_time_us());
        self.deadline = Some(self.clock.now_us() + settle);
        Ok(())
    }

    fn apply_tuning(&mut self, electrode: usize, tuning: &ElectrodeTuning) -> Result<(), ScanError> {
        self.device
            .set_global_current(tuning.modulation_current)
            .map_err(bus_error)?;
        self.device
            .set_charge(electrode, ChargeSettings::from_tuning(tuning))
            .map_err(bus_error)
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::super::mpr121::fake::FakeMpr121;
    use super::super::mpr121::{reg, Mpr121Config};
    use super::*;

    struct TestClock<'a>(&'a Cell<u64>);

    impl Clock for TestClock<'_> {
        fn now_us(&self) -> u64 {
            self.0.get()
        }
    }

    fn scanner(now: &Cell<u64>) -> Mpr121Scanner<FakeMpr121, TestClock<'_>> {
        let mut device = Mpr121::new(FakeMpr121::new(), Mpr121Config::default());
        device.init().unwrap();
        Mpr121Scanner::new(device, TestClock(now))
    }

    #[test]
    fn test_scan_waits_for_settle_time() {
        let now = Cell::new(1_000);
        let mut scan = scanner(&now);
        scan.device.bus_mut().set_filtered(3, 512);

        assert!(!scan.is_busy().unwrap());
        scan.start_scan().unwrap();
        assert!(scan.is_busy().unwrap());
        assert_eq!(scan.remaining_us(), Some(5_000));

        now.set(5_999);
        assert!(scan.is_busy().unwrap());
        assert_eq!(scan.read_raw(3).unwrap(), 0);

        now.set(6_000);
        assert!(!scan.is_busy().unwrap());
        assert_eq!(scan.read_raw(3).unwrap(), 511);
        assert!(!scan.device().is_running());
    }

    #[test]
    fn test_readings_hold_until_next_scan() {
        let now = Cell::new(0);
        let mut scan = scanner(&now);
        scan.device.bus_mut().set_filtered(0, 700);
        scan.start_scan().unwrap();
        now.set(10_000);
        assert!(!scan.is_busy().unwrap());

        scan.device.bus_mut().set_filtered(0, 300);
        assert_eq!(scan.read_raw(0).unwrap(), 323);
    }

    #[test]
    fn test_read_past_enabled_electrodes() {
        let now = Cell::new(0);
        let mut device = Mpr121::new(
            FakeMpr121::new(),
            Mpr121Config {
                electrodes: 4,
                ..Default::default()
            },
        );
        device.init().unwrap();
        let mut scan = Mpr121Scanner::new(device, TestClock(&now));
        assert_eq!(scan.read_raw(4), Err(ScanError::InvalidElectrode));
        assert_eq!(scan.read_raw(3), Ok(0));
    }

    #[test]
    fn test_apply_tuning_programs_charge() {
        let now = Cell::new(0);
        let mut scan = scanner(&now);
        let tuning = ElectrodeTuning {
            clock_divider: 2,
            modulation_current: 32,
            compensation_current: 18,
        };
        scan.apply_tuning(1, &tuning).unwrap();

        let regs = scan.device.bus_mut().regs;
        assert_eq!(regs[reg::AFE1 as usize] & 0x3F, 32);
        assert_eq!(regs[reg::CDC_BASE as usize + 1], 18);
        assert_eq!(regs[reg::CDT_BASE as usize], 2 << 4);
    }

    #[test]
    fn test_bus_failure_maps_to_scan_error() {
        let now = Cell::new(0);
        let mut scan = scanner(&now);
        scan.device.bus_mut().fail = true;
        assert_eq!(scan.start_scan(), Err(ScanError::Bus));
        assert_eq!(
            scan.apply_tuning(20, &ElectrodeTuning {
                clock_divider: 1,
                modulation_current: 1,
                compensation_current: 1,
            }),
            Err(ScanError::Bus)
        );
    }
}
