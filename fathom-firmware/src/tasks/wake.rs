//! Wake timer task
//!
//! Counts down the period the controller armed and raises the wake flag
//! each time it expires. Keeps the last period until re-armed.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Instant, Timer};

use fathom_core::signals::Signals;

use crate::channels::{raise, WAKE_PERIOD};

#[embassy_executor::task]
pub async fn wake_task() {
    info!("Wake task started");

    let mut period = WAKE_PERIOD.wait().await;
    let mut next = Instant::now() + period;

    loop {
        match select(Timer::at(next), WAKE_PERIOD.wait()).await {
            Either::First(()) => {
                raise(Signals::WAKE);
                next += period;
            }
            Either::Second(new_period) => {
                trace!("Wake period {} us", new_period.as_micros());
                period = new_period;
                next = Instant::now() + period;
            }
        }
    }
}
