//! Radio coprocessor UART receive task
//!
//! Receives COBS frames from the radio coprocessor and turns them into
//! controller signals.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use fathom_core::link::LinkMessage;
use fathom_core::wire::{FrameReader, MAX_FRAME_LEN};

use crate::channels::raise;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Link RX task - receives and decodes frames from the radio coprocessor
#[embassy_executor::task]
pub async fn link_rx_task(mut rx: BufferedUartRx) {
    info!("Link RX task started");

    let mut reader = FrameReader::<MAX_FRAME_LEN>::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                for &byte in &buf[..n] {
                    match reader.push::<LinkMessage>(byte) {
                        Some(Ok(msg)) => {
                            debug!("Link event: {:?}", msg);
                            raise(msg.signals());
                        }
                        Some(Err(e)) => warn!("Frame decode error: {:?}", e),
                        None => {}
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
