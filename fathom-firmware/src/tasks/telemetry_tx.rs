//! Data log UART transmit task

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_rp::uart::{Async, UartTx};

use fathom_core::wire::{encode_frame, MAX_FRAME_LEN};

use crate::channels::{TELEMETRY_DROPPED, TELEMETRY_RECORDS};

pub type TelemetryUart = UartTx<'static, Async>;

#[embassy_executor::task]
pub async fn telemetry_tx_task(mut uart: TelemetryUart) {
    info!("Telemetry TX task started");

    let mut buf = [0u8; MAX_FRAME_LEN];

    loop {
        let record = TELEMETRY_RECORDS.receive().await;

        let dropped = TELEMETRY_DROPPED.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!("{} telemetry records dropped", dropped);
        }

        match encode_frame(&record, &mut buf) {
            Ok(frame) => match uart.write(frame).await {
                Ok(()) => trace!("Sent telemetry for cycle {}", record.cycle),
                Err(_) => error!("Failed to write telemetry record to UART"),
            },
            Err(_) => error!("Failed to serialize telemetry record"),
        }
    }
}
