//! Fathom - Capacitive Liquid-Level Sensor Firmware
//!
//! Main firmware binary for RP2040-based level sensors. An MPR121 measures
//! an electrode strip, the core turns the counts into a fill level, and a
//! radio coprocessor on UART1 pushes the level to a connected client.
//!
//! Named after the old unit of water depth - a fathom is what a sounding
//! line reports, and what this firmware reports over the air.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::i2c::{Config as I2cConfig, I2c};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart, UartTx};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use fathom_core::{LevelController, Peripherals};
use fathom_drivers::capsense::{Mpr121, Mpr121Scanner};
use fathom_hal_rp2040::{RoscWakeTimer, Rp2040RowStorage};

use crate::board::{ChannelTelemetry, ChannelTransport, EmbassyClock};
use crate::channels::{SIGNALS, WAKE_PERIOD};
use crate::config::{ELECTRODES, MPR121, SENSOR};

mod board;
mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

/// MPR121 bus speed
const I2C_FREQUENCY_HZ: u32 = 400_000;

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Fathom firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    info!(
        "Sensor: {} electrodes, {} mm, threshold {}, {:?} telemetry",
        ELECTRODES, SENSOR.max_height_mm, SENSOR.threshold, SENSOR.telemetry
    );

    // MPR121 on I2C0 (SDA GPIO4, SCL GPIO5)
    let i2c_config = {
        let mut cfg = I2cConfig::default();
        cfg.frequency = I2C_FREQUENCY_HZ;
        cfg
    };
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config);
    let mut mpr121 = Mpr121::new(i2c, MPR121);
    match mpr121.init() {
        Ok(()) => info!("MPR121 initialized at {:#x}", MPR121.address),
        // Scans fail and get reported every cycle until the part answers
        Err(e) => error!("MPR121 init failed: {:?}", e),
    }
    let scanner = Mpr121Scanner::new(mpr121, EmbassyClock);

    // Radio coprocessor on UART1 (TX GPIO8, RX GPIO9)
    let uart_config = UartConfig::default(); // 115200 baud default

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART1, p.PIN_8, p.PIN_9, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (link_tx, link_rx) = uart.split();

    info!("UART initialized for radio link");

    // Data log on UART0 (TX GPIO0)
    let telemetry_uart = UartTx::new(p.UART0, p.PIN_0, p.DMA_CH0, UartConfig::default());

    // Accelerometer significant-motion interrupt
    let motion_pin = Input::new(p.PIN_15, Pull::Down);

    let peripherals = Peripherals {
        scan: scanner,
        transport: ChannelTransport,
        timer: RoscWakeTimer::new(&WAKE_PERIOD, SENSOR.oscillator.nominal_hz),
        telemetry: ChannelTelemetry,
        storage: Rp2040RowStorage::new(p.FLASH),
    };

    let controller = match LevelController::new(SENSOR, peripherals, &SIGNALS) {
        Ok(controller) => controller,
        Err(e) => defmt::panic!("Invalid sensor configuration: {:?}", e),
    };

    // Spawn tasks
    unwrap!(spawner.spawn(tasks::wake_task()));
    unwrap!(spawner.spawn(tasks::motion_task(motion_pin)));
    unwrap!(spawner.spawn(tasks::link_rx_task(link_rx)));
    unwrap!(spawner.spawn(tasks::link_tx_task(link_tx)));
    unwrap!(spawner.spawn(tasks::telemetry_tx_task(telemetry_uart)));
    unwrap!(spawner.spawn(tasks::controller_task(controller)));

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
