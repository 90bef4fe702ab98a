//! Main controller task
//!
//! Steps the level controller and sleeps whenever it asks to. Logs the
//! cycle reports the controller hands back.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};

use fathom_core::calibration::LoadOutcome;
use fathom_core::signals::Signals;
use fathom_core::wake::WakeArm;
use fathom_core::{CycleReport, Step, WaitFor};

use crate::board::SensorController;
use crate::channels::{SIGNALS, WAKEUP};

/// Controller task - runs the measurement cycle forever
#[embassy_executor::task]
pub async fn controller_task(mut controller: SensorController) {
    info!("Controller task started");

    match controller.boot() {
        LoadOutcome::Loaded => info!("Calibration loaded: {:?}", controller.offsets()),
        LoadOutcome::Defaulted(e) => warn!("No calibration ({:?}), using zero offsets", e),
    }

    loop {
        match controller.step() {
            Ok(Step::Continue) => {}
            Ok(Step::Report(report)) => log_report(&report),
            Ok(Step::Suspend(WaitFor::ScanCompletion)) => wait_for_scan(&controller).await,
            Ok(Step::Suspend(WaitFor::Wake(arm))) => {
                if let Some(arm) = arm {
                    log_arm(&arm);
                }
                WAKEUP.wait().await;
            }
            Err(fault) => {
                defmt::panic!("Controller fault: {:?}", fault);
            }
        }
    }
}

/// Sleep until the running scan settles or something else happens
async fn wait_for_scan(controller: &SensorController) {
    let Some(remaining) = controller.scan_engine().remaining_us() else {
        WAKEUP.wait().await;
        return;
    };

    match select(Timer::after(Duration::from_micros(remaining)), WAKEUP.wait()).await {
        Either::First(()) => SIGNALS.raise(Signals::SCAN_COMPLETE),
        Either::Second(()) => trace!("Woken during scan"),
    }
}

fn log_arm(arm: &WakeArm) {
    match arm.error {
        None => debug!(
            "Wake timer: {:?} cadence, {} ms = {} ticks",
            arm.cadence, arm.period_ms, arm.ticks
        ),
        Some(e) => warn!(
            "Wake timer calibration rejected ({:?}), {} ms = {} nominal ticks",
            e, arm.period_ms, arm.ticks
        ),
    }
}

fn log_report(report: &CycleReport) {
    let height = report.height.hundredths();
    debug!(
        "Cycle {}: {}% ({}.{}{} mm), weight {}",
        report.cycle,
        report.level(),
        height / 100,
        height / 10 % 10,
        height % 10,
        report.active_weight
    );

    if let Some(e) = report.scan {
        warn!("Scan failed: {:?}, level from previous readings", e);
    }
    if let Some(e) = report.tuning {
        warn!("Applying scan tuning failed: {:?}", e);
    }
    match report.calibration {
        Some(Ok(())) => info!("Empty calibration saved"),
        Some(Err(e)) => error!("Saving calibration failed: {:?}", e),
        None => {}
    }
    if let Some(level) = report.link.notified {
        trace!("Notified level {}%", level);
    }
    if let Some(e) = report.link.error {
        warn!("Link sync failed: {:?}", e);
    }
    if let Some(e) = report.telemetry {
        trace!("Telemetry dropped: {:?}", e);
    }
}
