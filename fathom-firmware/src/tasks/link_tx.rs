//! Radio coprocessor UART transmit task

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use fathom_core::wire::{encode_frame, MAX_FRAME_LEN};

use crate::channels::HOST_MESSAGES;

/// Link TX task - sends queued host messages as COBS frames
#[embassy_executor::task]
pub async fn link_tx_task(mut tx: BufferedUartTx) {
    info!("Link TX task started");

    let mut buf = [0u8; MAX_FRAME_LEN];

    loop {
        let msg = HOST_MESSAGES.receive().await;
        match encode_frame(&msg, &mut buf) {
            Ok(frame) => match tx.write_all(frame).await {
                Ok(()) => trace!("Sent {:?}", msg),
                Err(e) => warn!("Failed to send link message: {:?}", e),
            },
            Err(e) => error!("Failed to encode link message: {:?}", e),
        }
    }
}
