//! Accelerometer motion interrupt task

use defmt::*;
use embassy_rp::gpio::Input;

use fathom_core::signals::Signals;

use crate::channels::raise;

/// Raises the motion flag on every rising edge of the interrupt line
#[embassy_executor::task]
pub async fn motion_task(mut int_pin: Input<'static>) {
    info!("Motion task started");

    loop {
        int_pin.wait_for_rising_edge().await;
        debug!("Motion detected");
        raise(Signals::MOTION);
    }
}
