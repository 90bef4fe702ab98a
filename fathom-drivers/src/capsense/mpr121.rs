//! MPR121 capacitive touch controller
//!
//! The MPR121 measures up to 12 electrodes by charging each one with a
//! constant current for a fixed time and digitizing the resulting voltage.
//! A bigger capacitance (more liquid next to the electrode) gives a lower
//! voltage and so a lower count.
//!
//! # Protocol
//!
//! Plain I2C register access with auto-incrementing addresses:
//! - Write: `[register, data...]`
//! - Read: write `[register]`, repeated start, read `n` bytes
//!
//! Configuration registers can only be written in Stop Mode (ECR = 0).
//! Writing ECR with a non-zero electrode count enters Run Mode; the part
//! then measures every electrode once per sample interval and updates the
//! filtered data registers.
//!
//! # Charge settings
//!
//! Each electrode is charged with a current of 1-63 uA (CDC) for a time of
//! 0.5-32 us (CDT, encoded as 1-7 for `0.5 us * 2^(n-1)`). Per-electrode
//! values override the global ones in AFE1/AFE2 when non-zero.

use embedded_hal::i2c::I2c;

use fathom_core::config::ElectrodeTuning;

/// Default 7-bit address (ADDR pin tied to GND)
pub const DEFAULT_ADDRESS: u8 = 0x5A;

/// Electrodes the part can measure
pub const ELECTRODES: usize = 12;

/// Largest 10-bit filtered count
pub const FULL_SCALE: u16 = 0x3FF;

/// Register addresses
pub mod reg {
    /// Electrode 0 filtered data, LSB. Each electrode takes two bytes.
    pub const FILTERED_DATA: u8 = 0x04;
    /// AFE configuration 1: FFI[7:6] | CDC[5:0]
    pub const AFE1: u8 = 0x5C;
    /// AFE configuration 2: CDT[7:5] | SFI[4:3] | ESI[2:0]
    pub const AFE2: u8 = 0x5D;
    /// Electrode configuration: CL[7:6] | ELEPROX_EN[5:4] | ELE_EN[3:0]
    pub const ECR: u8 = 0x5E;
    /// Electrode 0 charge current, one register per electrode
    pub const CDC_BASE: u8 = 0x5F;
    /// Electrode 0/1 charge time, two electrodes per register
    pub const CDT_BASE: u8 = 0x6C;
    /// Soft reset, write [`SOFT_RESET_KEY`](super::SOFT_RESET_KEY)
    pub const SOFT_RESET: u8 = 0x80;
}

/// Value that triggers a soft reset
pub const SOFT_RESET_KEY: u8 = 0x63;

/// AFE2 content right after a reset
const AFE2_RESET_VALUE: u8 = 0x24;

/// CL = 01, baseline tracking disabled
const ECR_CALIBRATION_LOCK: u8 = 0b01 << 6;

const MAX_CHARGE_CURRENT: u8 = 63;
const MAX_CHARGE_TIME: u8 = 7;
const CDT_REGISTERS: usize = ELECTRODES / 2;

/// Samples taken for the first filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FirstFilter {
    #[default]
    Samples6 = 0,
    Samples10 = 1,
    Samples18 = 2,
    Samples34 = 3,
}

/// Samples averaged by the second filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecondFilter {
    #[default]
    Samples4 = 0,
    Samples6 = 1,
    Samples10 = 2,
    Samples18 = 3,
}

impl SecondFilter {
    pub fn samples(self) -> u32 {
        match self {
            Self::Samples4 => 4,
            Self::Samples6 => 6,
            Self::Samples10 => 10,
            Self::Samples18 => 18,
        }
    }
}

/// MPR121 configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mpr121Config {
    /// 7-bit I2C address (0x5A-0x5D)
    pub address: u8,
    /// Electrodes enabled in Run Mode, counted from ELE0
    pub electrodes: u8,
    pub first_filter: FirstFilter,
    pub second_filter: SecondFilter,
    /// Sample interval code, period is `2^esi` ms (0-7)
    pub sample_interval: u8,
}

impl Default for Mpr121Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            electrodes: ELECTRODES as u8,
            first_filter: FirstFilter::Samples6,
            second_filter: SecondFilter::Samples4,
            sample_interval: 0,
        }
    }
}

impl Mpr121Config {
    /// Sample interval in microseconds
    pub fn sample_interval_us(&self) -> u32 {
        1000 << self.sample_interval.min(7)
    }

    /// Time after entering Run Mode until the second filter holds only
    /// fresh samples
    pub fn settle_time_us(&self) -> u32 {
        self.sample_interval_us() * (self.second_filter.samples() + 1)
    }
}

/// MPR121 errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mpr121Error<E> {
    /// Bus transaction failed
    I2c(E),
    /// Device did not come out of reset with the expected AFE2 value
    NotFound,
    /// Electrode index is not enabled
    InvalidElectrode,
    /// Configuration write attempted in Run Mode
    Running,
}

/// Charge settings for one electrode in register units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeSettings {
    /// Charge current in uA (0 uses the global value)
    pub current: u8,
    /// Charge time code (0 uses the global value)
    pub time: u8,
}

impl ChargeSettings {
    /// Per-electrode settings for a tuning entry
    ///
    /// The compensation current becomes the electrode's charge current and
    /// the clock divider its charge time code.
    pub fn from_tuning(tuning: &ElectrodeTuning) -> Self {
        Self {
            current: tuning.compensation_current.min(MAX_CHARGE_CURRENT),
            time: tuning.clock_divider.min(MAX_CHARGE_TIME),
        }
    }
}

/// MPR121 driver over a blocking I2C bus
pub struct Mpr121<I2C> {
    i2c: I2C,
    config: Mpr121Config,
    /// Shadow of the CDT registers, which pack two electrodes each
    cdt: [u8; CDT_REGISTERS],
    global_current: u8,
    running: bool,
}

impl<I2C: I2c> Mpr121<I2C> {
    /// Create a driver, no bus traffic until [`init`](Self::init)
    pub fn new(i2c: I2C, config: Mpr121Config) -> Self {
        Self {
            i2c,
            config,
            cdt: [0; CDT_REGISTERS],
            global_current: 0,
            running: false,
        }
    }

    pub fn config(&self) -> &Mpr121Config {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Reset the part and program the filter settings
    ///
    /// Leaves the part in Stop Mode.
    pub fn init(&mut self) -> Result<(), Mpr121Error<I2C::Error>> {
        self.write(reg::SOFT_RESET, SOFT_RESET_KEY)?;
        self.running = false;
        self.cdt = [0; CDT_REGISTERS];
        self.global_current = 0;

        if self.read(reg::AFE2)? != AFE2_RESET_VALUE {
            return Err(Mpr121Error::NotFound);
        }

        self.write(reg::AFE1, self.afe1())?;
        self.write(reg::AFE2, self.afe2())
    }

    /// Enter Run Mode with the configured electrodes
    pub fn start(&mut self) -> Result<(), Mpr121Error<I2C::Error>> {
        let count = self.config.electrodes.min(ELECTRODES as u8);
        self.write(reg::ECR, ECR_CALIBRATION_LOCK | count)?;
        self.running = true;
        Ok(())
    }

    /// Enter Stop Mode
    pub fn stop(&mut self) -> Result<(), Mpr121Error<I2C::Error>> {
        self.write(reg::ECR, 0)?;
        self.running = false;
        Ok(())
    }

    /// Set the charge current used by electrodes without their own
    ///
    /// Skips the bus write when nothing changes.
    pub fn set_global_current(&mut self, current: u8) -> Result<(), Mpr121Error<I2C::Error>> {
        let current = current.min(MAX_CHARGE_CURRENT);
        if current == self.global_current {
            return Ok(());
        }
        self.ensure_stopped()?;
        self.global_current = current;
        self.write(reg::AFE1, self.afe1())
    }

    /// Program one electrode's charge current and time
    pub fn set_charge(
        &mut self,
        electrode: usize,
        settings: ChargeSettings,
    ) -> Result<(), Mpr121Error<I2C::Error>> {
        if electrode >= self.config.electrodes as usize || electrode >= ELECTRODES {
            return Err(Mpr121Error::InvalidElectrode);
        }
        self.ensure_stopped()?;

        let current = settings.current.min(MAX_CHARGE_CURRENT);
        self.write(reg::CDC_BASE + electrode as u8, current)?;

        let slot = electrode / 2;
        let time = settings.time.min(MAX_CHARGE_TIME);
        let packed = if electrode % 2 == 0 {
            (self.cdt[slot] & 0xF0) | time
        } else {
            (self.cdt[slot] & 0x0F) | (time << 4)
        };
        self.write(reg::CDT_BASE + slot as u8, packed)?;
        self.cdt[slot] = packed;
        Ok(())
    }

    /// Burst-read the 10-bit filtered data of the first `out.len()` electrodes
    pub fn read_filtered(&mut self, out: &mut [u16]) -> Result<(), Mpr121Error<I2C::Error>> {
        if out.len() > ELECTRODES {
            return Err(Mpr121Error::InvalidElectrode);
        }
        let mut raw = [0u8; ELECTRODES * 2];
        let raw = &mut raw[..out.len() * 2];
        self.i2c
            .write_read(self.config.address, &[reg::FILTERED_DATA], raw)
            .map_err(Mpr121Error::I2c)?;

        for (value, bytes) in out.iter_mut().zip(raw.chunks_exact(2)) {
            *value = u16::from(bytes[0]) | (u16::from(bytes[1] & 0x03) << 8);
        }
        Ok(())
    }

    /// Release the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    fn ensure_stopped(&self) -> Result<(), Mpr121Error<I2C::Error>> {
        if self.running {
            Err(Mpr121Error::Running)
        } else {
            Ok(())
        }
    }

    fn afe1(&self) -> u8 {
        ((self.config.first_filter as u8) << 6) | self.global_current
    }

    fn afe2(&self) -> u8 {
        // Global CDT stays at the reset value of 0.5 us
        (1 << 5) | ((self.config.second_filter as u8) << 3) | self.config.sample_interval.min(7)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), Mpr121Error<I2C::Error>> {
        self.i2c
            .write(self.config.address, &[register, value])
            .map_err(Mpr121Error::I2c)
    }

    fn read(&mut self, register: u8) -> Result<u8, Mpr121Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.config.address, &[register], &mut buf)
            .map_err(Mpr121Error::I2c)?;
        Ok(buf[0])
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

    /// Register file behind an I2C address with auto-increment
    pub struct FakeMpr121 {
        pub regs: [u8; 256],
        pub address: u8,
        pub writes: u32,
        pub fail: bool,
        /// Soft reset leaves AFE2 at this value
        pub reset_afe2: u8,
        pointer: u8,
    }

    impl FakeMpr121 {
        pub fn new() -> Self {
            Self {
                regs: [0; 256],
                address: super::DEFAULT_ADDRESS,
                writes: 0,
                fail: false,
                reset_afe2: super::AFE2_RESET_VALUE,
                pointer: 0,
            }
        }

        /// Load a 10-bit filtered value for `electrode`
        pub fn set_filtered(&mut self, electrode: usize, value: u16) {
            let base = super::reg::FILTERED_DATA as usize + electrode * 2;
            self.regs[base] = value as u8;
            // Upper bits of the MSB register read back as garbage on real parts
            self.regs[base + 1] = ((value >> 8) as u8 & 0x03) | 0xF0;
        }
    }

    impl ErrorType for FakeMpr121 {
        type Error = ErrorKind;
    }

    impl I2c for FakeMpr121 {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail || address != self.address {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        let Some((&register, data)) = bytes.split_first() else {
                            continue;
                        };
                        self.pointer = register;
                        for &b in data {
                            self.writes += 1;
                            if self.pointer == super::reg::SOFT_RESET && b == super::SOFT_RESET_KEY
                            {
                                self.regs = [0; 256];
                                self.regs[super::reg::AFE2 as usize] = self.reset_afe2;
                            } else {
                                self.regs[self.pointer as usize] = b;
                            }
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                    Operation::Read(buf) => {
                        for b in buf.iter_mut() {
                            *b = self.regs[self.pointer as usize];
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeMpr121;
    use super::*;

    fn device() -> Mpr121<FakeMpr121> {
        let mut dev = Mpr121::new(FakeMpr121::new(), Mpr121Config::default());
        dev.init().unwrap();
        dev
    }

    #[test]
    fn test_init_programs_filters() {
        let config = Mpr121Config {
            first_filter: FirstFilter::Samples18,
            second_filter: SecondFilter::Samples10,
            sample_interval: 3,
            ..Default::default()
        };
        let mut dev = Mpr121::new(FakeMpr121::new(), config);
        dev.init().unwrap();

        let bus = dev.release();
        assert_eq!(bus.regs[reg::AFE1 as usize], 0b10 << 6);
        assert_eq!(bus.regs[reg::AFE2 as usize], (1 << 5) | (0b10 << 3) | 3);
        assert_eq!(bus.regs[reg::ECR as usize], 0);
    }

    #[test]
    fn test_init_detects_missing_part() {
        let mut bus = FakeMpr121::new();
        bus.reset_afe2 = 0x00;
        let mut dev = Mpr121::new(bus, Mpr121Config::default());
        assert_eq!(dev.init(), Err(Mpr121Error::NotFound));
    }

    #[test]
    fn test_bus_error_propagates() {
        let mut bus = FakeMpr121::new();
        bus.fail = true;
        let mut dev = Mpr121::new(bus, Mpr121Config::default());
        assert!(matches!(dev.init(), Err(Mpr121Error::I2c(_))));
    }

    #[test]
    fn test_start_and_stop() {
        let mut dev = device();
        dev.start().unwrap();
        assert!(dev.is_running());

        dev.stop().unwrap();
        assert!(!dev.is_running());

        let mut dev = Mpr121::new(
            FakeMpr121::new(),
            Mpr121Config {
                electrodes: 7,
                ..Default::default()
            },
        );
        dev.init().unwrap();
        dev.start().unwrap();
        assert_eq!(dev.release().regs[reg::ECR as usize], 0x40 | 7);
    }

    #[test]
    fn test_charge_packs_time_pairs() {
        let mut dev = device();
        dev.set_charge(4, ChargeSettings { current: 20, time: 3 })
            .unwrap();
        dev.set_charge(5, ChargeSettings { current: 70, time: 9 })
            .unwrap();

        let bus = dev.release();
        assert_eq!(bus.regs[reg::CDC_BASE as usize + 4], 20);
        // Current and time clamp to their field widths
        assert_eq!(bus.regs[reg::CDC_BASE as usize + 5], 63);
        assert_eq!(bus.regs[reg::CDT_BASE as usize + 2], (7 << 4) | 3);
    }

    #[test]
    fn test_charge_rejected_while_running() {
        let mut dev = device();
        dev.start().unwrap();
        assert_eq!(
            dev.set_charge(0, ChargeSettings { current: 1, time: 1 }),
            Err(Mpr121Error::Running)
        );
        assert_eq!(dev.set_global_current(16), Err(Mpr121Error::Running));
    }

    #[test]
    fn test_charge_invalid_electrode() {
        let mut dev = device();
        assert_eq!(
            dev.set_charge(12, ChargeSettings { current: 1, time: 1 }),
            Err(Mpr121Error::InvalidElectrode)
        );
    }

    #[test]
    fn test_global_current_skips_repeat_writes() {
        let mut dev = device();
        dev.set_global_current(16).unwrap();
        let writes = dev.i2c.writes;
        dev.set_global_current(16).unwrap();
        assert_eq!(dev.i2c.writes, writes);
        assert_eq!(dev.release().regs[reg::AFE1 as usize], 16);
    }

    #[test]
    fn test_read_filtered_masks_upper_bits() {
        let mut dev = device();
        dev.i2c.set_filtered(0, 0x3FF);
        dev.i2c.set_filtered(1, 0x155);
        dev.i2c.set_filtered(11, 725);

        let mut out = [0u16; ELECTRODES];
        dev.read_filtered(&mut out).unwrap();
        assert_eq!(out[0], 0x3FF);
        assert_eq!(out[1], 0x155);
        assert_eq!(out[11], 725);
        assert_eq!(out[5], 0);
    }

    #[test]
    fn test_tuning_mapping() {
        let settings = ChargeSettings::from_tuning(&ElectrodeTuning {
            clock_divider: 9,
            modulation_current: 150,
            compensation_current: 20,
        });
        assert_eq!(settings, ChargeSettings { current: 20, time: 7 });
    }

    #[test]
    fn test_settle_time() {
        let config = Mpr121Config::default();
        assert_eq!(config.settle_time_us(), 5_000);

        let config = Mpr121Config {
            sample_interval: 2,
            second_filter: SecondFilter::Samples6,
            ..Default::default()
        };
        assert_eq!(config.settle_time_us(), 28_000);
    }
}
