//! Measurement cycle controller
//!
//! [`LevelController`] owns the peripherals and all runtime state, and
//! advances the [`State`] machine one state per [`LevelController::step`].
//! It never blocks: in states that wait for hardware it returns
//! [`Step::Suspend`] and the caller sleeps until a signal arrives, then
//! steps again.
//!
//! The controller does not log. Everything worth logging comes back in a
//! [`CycleReport`] once per cycle, or in the [`WaitFor`] of a suspension.

use crate::calibration::{Calibration, CalibrationError, CalibrationStore, LoadOutcome};
use crate::config::{ConfigError, ScanTuning, SensorConfig};
use crate::fixed::Q24_8;
use crate::level::{estimate, EstimatorParams, Geometry, LevelMeasurement, Offsets, Readings};
use crate::link::{LinkSession, SyncReport};
use crate::signals::{SignalFlags, Signals};
use crate::state::{Event, Fault, State};
use crate::telemetry::TelemetryRecord;
use crate::traits::{
    RowStorage, ScanEngine, ScanError, Telemetry, TelemetryError, Transport, WakeTimer,
};
use crate::wake::{Cadence, WakeArm, WakeCalibrator, WakeSchedule};

/// Board peripherals the controller drives
pub struct Peripherals<E, T, W, M, S> {
    pub scan: E,
    pub transport: T,
    pub timer: W,
    pub telemetry: M,
    pub storage: S,
}

/// What the caller should wait for before stepping again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitFor {
    /// Scan complete or the next wake timer match
    ScanCompletion,
    /// Wake timer match, motion or link activity
    ///
    /// Carries the new timer setting when this sleep re-armed it.
    Wake(Option<WakeArm>),
}

/// Outcome of one [`LevelController::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Step again right away
    Continue,
    /// Sleep until a signal arrives, then step again
    Suspend(WaitFor),
    /// A cycle finished; step again right away
    Report(CycleReport),
}

/// Summary of one completed measurement cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub cycle: u32,
    pub height: Q24_8,
    pub percent: Q24_8,
    pub active_weight: u32,
    /// Scan failure; the level was computed from the previous readings
    pub scan: Option<ScanError>,
    /// Applying scan tuning failed; retried next cycle
    pub tuning: Option<ScanError>,
    /// Result of writing a captured calibration
    pub calibration: Option<Result<(), CalibrationError>>,
    pub link: SyncReport,
    pub telemetry: Option<TelemetryError>,
}

impl CycleReport {
    /// Whole percent
    pub fn level(&self) -> i32 {
        self.percent.whole()
    }
}

/// Runs the scan, process, notify, sleep cycle for an `N`-electrode strip
pub struct LevelController<'a, E, T, W, M, S, const N: usize> {
    config: SensorConfig<N>,
    geometry: Geometry,
    signals: &'a SignalFlags,

    scan: E,
    transport: T,
    timer: W,
    telemetry: M,
    store: CalibrationStore<S>,

    state: State,
    readings: Readings<N>,
    previous: Readings<N>,
    calibration: Calibration<N>,
    measurement: LevelMeasurement<N>,
    link: LinkSession,
    calibrator: WakeCalibrator,
    schedule: WakeSchedule,

    tuning_pending: bool,
    capture_requested: bool,
    scan_wakes: u16,
    motion_hold: u16,
    asleep: bool,
    cycle: u32,
    report: CycleReport,
}

impl<'a, E, T, W, M, S, const N: usize> LevelController<'a, E, T, W, M, S, N>
where
    E: ScanEngine,
    T: Transport,
    W: WakeTimer,
    M: Telemetry,
    S: RowStorage,
{
    /// Create a controller in the `Scanning` state with zero offsets
    ///
    /// Call [`LevelController::boot`] before the first step to load the
    /// stored calibration.
    pub fn new(
        config: SensorConfig<N>,
        peripherals: Peripherals<E, T, W, M, S>,
        signals: &'a SignalFlags,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let geometry = config.geometry()?;

        Ok(Self {
            geometry,
            signals,
            scan: peripherals.scan,
            transport: peripherals.transport,
            timer: peripherals.timer,
            telemetry: peripherals.telemetry,
            store: CalibrationStore::new(peripherals.storage, config.calibration_offset),
            state: State::Scanning,
            readings: [0; N],
            previous: [0; N],
            calibration: Calibration::new([0; N]),
            measurement: LevelMeasurement::empty(),
            link: LinkSession::new(),
            calibrator: WakeCalibrator::new(config.oscillator),
            schedule: WakeSchedule::new(),
            tuning_pending: true,
            capture_requested: false,
            scan_wakes: 0,
            motion_hold: 0,
            asleep: false,
            cycle: 0,
            report: CycleReport::default(),
            config,
        })
    }

    /// Load the stored calibration
    ///
    /// Missing or corrupt records leave the offsets at zero.
    pub fn boot(&mut self) -> LoadOutcome {
        let (offsets, outcome) = self.store.load::<N>();
        self.calibration = Calibration::new(offsets);
        outcome
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &SensorConfig<N> {
        &self.config
    }

    pub fn measurement(&self) -> &LevelMeasurement<N> {
        &self.measurement
    }

    pub fn readings(&self) -> &Readings<N> {
        &self.readings
    }

    /// Readings of the cycle before the current one
    pub fn previous_readings(&self) -> &Readings<N> {
        &self.previous
    }

    pub fn offsets(&self) -> &Offsets<N> {
        self.calibration.offsets()
    }

    pub fn link(&self) -> &LinkSession {
        &self.link
    }

    /// Period currently armed on the wake timer
    pub fn cadence(&self) -> Option<Cadence> {
        self.schedule.armed()
    }

    pub fn scan_engine(&self) -> &E {
        &self.scan
    }

    pub fn scan_engine_mut(&mut self) -> &mut E {
        &mut self.scan
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn wake_timer(&self) -> &W {
        &self.timer
    }

    pub fn telemetry(&self) -> &M {
        &self.telemetry
    }

    pub fn storage(&self) -> &S {
        self.store.storage()
    }

    pub fn storage_mut(&mut self) -> &mut S {
        self.store.storage_mut()
    }

    /// Replace the scan tunables; applied at the start of the next scan
    pub fn set_tuning(&mut self, tuning: ScanTuning<N>) {
        self.config.tuning = tuning;
        self.tuning_pending = true;
    }

    /// Capture the next scan as the empty baseline
    pub fn request_capture(&mut self) {
        self.capture_requested = true;
    }

    /// Run the current state once
    pub fn step(&mut self) -> Result<Step, Fault> {
        let polled = self.poll();

        match self.state {
            State::Scanning => self.start_scan(),
            State::AwaitingScanCompletion => self.await_scan(),
            State::Processing => self.process(),
            State::TransportSync => self.sync(),
            State::Sleeping => self.sleep(polled),
        }
    }

    fn advance(&mut self, event: Event) -> Result<(), Fault> {
        self.state = self.state.next(event)?;
        Ok(())
    }

    /// Drain and apply link, motion and capture signals
    fn poll(&mut self) -> Signals {
        let polled = self
            .signals
            .take(Signals::LINK.union(Signals::MOTION).union(Signals::CAPTURE));

        self.link.apply(polled);
        if polled.contains(Signals::DISCONNECTED) {
            self.measurement = LevelMeasurement::empty();
        }
        if polled.contains(Signals::MOTION) {
            self.motion_hold = self.config.motion_hold_cycles;
        }
        if polled.contains(Signals::CAPTURE) {
            self.capture_requested = true;
        }

        polled
    }

    fn start_scan(&mut self) -> Result<Step, Fault> {
        if self.tuning_pending {
            self.tuning_pending = false;
            for i in 0..N {
                let tuning = self.config.tuning.electrode(i);
                if let Err(e) = self.scan.apply_tuning(i, &tuning) {
                    self.report.tuning = Some(e);
                    self.tuning_pending = true;
                    break;
                }
            }
        }

        self.previous = self.readings;
        self.scan_wakes = 0;
        self.signals.take(Signals::SCAN_COMPLETE);

        let started = match self.scan.is_busy() {
            Ok(true) => Ok(()),
            Ok(false) => self.scan.start_scan(),
            Err(e) => Err(e),
        };

        match started {
            Ok(()) => self.advance(Event::ScanRequested)?,
            Err(e) => {
                self.report.scan = Some(e);
                self.advance(Event::ScanFailed)?;
            }
        }

        Ok(Step::Continue)
    }

    fn await_scan(&mut self) -> Result<Step, Fault> {
        let woken = self.signals.take(Signals::SCAN_COMPLETE.union(Signals::WAKE));

        match self.scan.is_busy() {
            Ok(false) => {
                self.advance(Event::ScanComplete)?;
                Ok(Step::Continue)
            }
            Ok(true) => {
                if woken.contains(Signals::WAKE) {
                    self.scan_wakes = self.scan_wakes.saturating_add(1);
                }
                if self.scan_wakes >= self.config.scan_timeout_wakes {
                    self.report.scan = Some(ScanError::Timeout);
                    self.advance(Event::ScanTimedOut)?;
                    Ok(Step::Continue)
                } else {
                    Ok(Step::Suspend(WaitFor::ScanCompletion))
                }
            }
            Err(e) => {
                self.report.scan = Some(e);
                self.advance(Event::ScanFailed)?;
                Ok(Step::Continue)
            }
        }
    }

    fn process(&mut self) -> Result<Step, Fault> {
        if self.report.scan.is_none() {
            for i in 0..N {
                match self.scan.read_raw(i) {
                    Ok(raw) => self.readings[i] = raw,
                    Err(e) => {
                        self.report.scan = Some(e);
                        self.readings = self.previous;
                        break;
                    }
                }
            }
        }

        let rejected = if self.capture_requested {
            self.capture_requested = false;
            self.calibration.capture(&self.readings).err()
        } else {
            None
        };

        let params = EstimatorParams {
            scales: &self.config.scales,
            weights: &self.config.weights,
            geometry: self.geometry,
            threshold: self.config.threshold,
        };
        self.measurement = estimate(&self.readings, self.calibration.offsets(), &params);

        self.report.calibration = match rejected {
            Some(e) => Some(Err(e)),
            None => self.calibration.flush(&mut self.store),
        };

        self.advance(Event::Processed)?;
        Ok(Step::Continue)
    }

    fn sync(&mut self) -> Result<Step, Fault> {
        self.report.link = self
            .link
            .sync(&mut self.transport, self.measurement.percent_byte());

        if let Some(record) = TelemetryRecord::capture(
            self.config.telemetry,
            self.cycle,
            &self.readings,
            &self.measurement,
            self.link.is_connected(),
        ) {
            self.report.telemetry = self.telemetry.publish(&record).err();
        }

        self.advance(Event::Synced)?;

        let mut report = core::mem::take(&mut self.report);
        report.cycle = self.cycle;
        report.height = self.measurement.height;
        report.percent = self.measurement.percent;
        report.active_weight = self.measurement.active_weight;
        self.cycle = self.cycle.wrapping_add(1);

        Ok(Step::Report(report))
    }

    fn sleep(&mut self, polled: Signals) -> Result<Step, Fault> {
        if !self.asleep {
            let cadence = if self.link.is_connected() || self.motion_hold > 0 {
                Cadence::Fast
            } else {
                Cadence::Slow
            };
            self.motion_hold = self.motion_hold.saturating_sub(1);

            let arm = self.schedule.select(
                cadence,
                &self.config.cadence,
                &self.calibrator,
                &mut self.timer,
            );

            // A match that fired while awake must not end this sleep
            self.signals.take(Signals::WAKE);
            self.asleep = true;
            return Ok(Step::Suspend(WaitFor::Wake(arm)));
        }

        let woken = self.signals.take(Signals::WAKE).union(polled);
        if woken.intersects(Signals::WAKE_SOURCES) {
            self.asleep = false;
            self.advance(Event::Woken)?;
            Ok(Step::Continue)
        } else {
            Ok(Step::Suspend(WaitFor::Wake(None)))
        }
    }
}

impl<'a, E, T, W, M, S, const N: usize> LevelController<'a, E, T, W, M, S, N> {
    /// Give back the storage, e.g. to simulate a reboot
    pub fn into_storage(self) -> S {
        self.store.into_inner()
    }
}
