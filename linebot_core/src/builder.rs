//! Type-state builder for `LineTracker` and the generic `build_tracker`.
//!
//! The builder only offers `build()` once a sensor and a motor are set.
//! `try_build()` is available in any state and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use linebot_traits::clock::{Clock, MonotonicClock};
use linebot_traits::{Buzzer, Indicator, LineSensor, Motor};

use crate::collision::DisengageReport;
use crate::config::*;
use crate::error::{BuildError, Result};
use crate::fsm::{FsmState, ModeFlags};
use crate::mixer::DutyCyclePair;
use crate::mocks::{NullIndicator, SilentBuzzer};
use crate::position::{Offset, SensorBitmap};
use crate::status::{ControlStatus, Observation, TickStatus};
use crate::tracker::{Lifecycle, TrackerContext, TrackerCore};

type DynCore = TrackerCore<
    Box<dyn LineSensor>,
    Box<dyn Motor>,
    Box<dyn Indicator>,
    Box<dyn Buzzer>,
>;

/// Boxed tracker with the peripherals behind trait objects.
pub struct LineTracker {
    pub(crate) inner: DynCore,
}

impl core::fmt::Debug for LineTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LineTracker")
            .field("state", &self.inner.state())
            .field("duty", &self.inner.duty())
            .field("lifecycle", &self.inner.lifecycle())
            .finish()
    }
}

impl LineTracker {
    pub fn builder() -> LineTrackerBuilder<Missing, Missing> {
        LineTrackerBuilder::default()
    }

    pub fn init(&mut self) -> Result<()> {
        self.inner.init()
    }

    pub fn on_tick(&mut self) -> Result<TickStatus> {
        self.inner.on_tick()
    }

    pub fn on_control_period(&mut self) -> Result<ControlStatus> {
        self.inner.on_control_period()
    }

    pub fn step_from_bitmap(&mut self, raw: SensorBitmap) -> Observation {
        self.inner.step_from_bitmap(raw)
    }

    pub fn handle_collision(&mut self, mask: u8) -> Option<DisengageReport> {
        self.inner.handle_collision(mask)
    }

    pub fn probe(&mut self, wait: Duration) -> Result<(SensorBitmap, Offset)> {
        self.inner.probe(wait)
    }

    /// Stop the motors (best-effort).
    pub fn motor_stop(&mut self) -> Result<()> {
        self.inner.motor_stop()
    }

    pub fn state(&self) -> FsmState {
        self.inner.state()
    }

    pub fn flags(&self) -> ModeFlags {
        self.inner.flags()
    }

    pub fn duty(&self) -> DutyCyclePair {
        self.inner.duty()
    }

    pub fn context(&self) -> &TrackerContext {
        self.inner.context()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle()
    }

    pub fn is_halted(&self) -> bool {
        self.inner.is_halted()
    }

    pub fn last_observation(&self) -> Option<Observation> {
        self.inner.last_observation()
    }

    pub fn bump_mask(&self) -> Option<u8> {
        self.inner.bump_mask()
    }

    pub fn schedule_cfg(&self) -> &ScheduleCfg {
        self.inner.schedule_cfg()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `LineTracker`. Configuration is validated on `build()`.
pub struct LineTrackerBuilder<S, M> {
    sensor: Option<Box<dyn LineSensor>>,
    motor: Option<Box<dyn Motor>>,
    indicator: Option<Box<dyn Indicator>>,
    buzzer: Option<Box<dyn Buzzer>>,
    pid: Option<PidCfg>,
    drive: Option<DriveCfg>,
    schedule: Option<ScheduleCfg>,
    fsm: Option<FsmCfg>,
    collision: Option<CollisionCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _m: PhantomData<M>,
}

impl Default for LineTrackerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            motor: None,
            indicator: None,
            buzzer: None,
            pid: None,
            drive: None,
            schedule: None,
            fsm: None,
            collision: None,
            clock: None,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

/// Tuning bundle passed through to `validate_and_build`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerCfg {
    pub pid: PidCfg,
    pub drive: DriveCfg,
    pub schedule: ScheduleCfg,
    pub fsm: FsmCfg,
    pub collision: CollisionCfg,
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Single place where configuration is checked and a core is assembled.
fn validate_and_build<S, M, I, B>(
    sensor: S,
    motor: M,
    indicator: I,
    buzzer: B,
    cfg: TrackerCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TrackerCore<S, M, I, B>>
where
    S: LineSensor,
    M: Motor,
    I: Indicator,
    B: Buzzer,
{
    let TrackerCfg {
        pid,
        drive,
        schedule,
        fsm,
        collision,
    } = cfg;

    if !(pid.kp.is_finite() && pid.ki.is_finite() && pid.kd.is_finite()) {
        return Err(invalid("PID gains must be finite"));
    }
    if !pid.desired.is_finite() {
        return Err(invalid("PID set-point must be finite"));
    }
    if drive.nominal == 0 {
        return Err(invalid("nominal duty must be > 0"));
    }
    if drive.swing > drive.nominal {
        return Err(invalid("drive swing must not exceed nominal duty"));
    }
    if drive.nominal.checked_add(drive.swing).is_none() {
        return Err(invalid("nominal + swing overflows the duty range"));
    }
    if schedule.tick_hz == 0 || schedule.control_hz == 0 {
        return Err(invalid("tick and control rates must be > 0"));
    }
    if schedule.acquisition_every <= ScheduleCfg::END_PHASE {
        return Err(invalid("acquisition_every must be >= 3"));
    }
    if fsm.center_band <= 0 {
        return Err(invalid("center_band must be > 0"));
    }
    if fsm.recovery_limit <= fsm.center_band {
        return Err(invalid("recovery_limit must exceed center_band"));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    Ok(TrackerCore {
        sensor,
        motor,
        indicator,
        buzzer,
        clock,
        pid,
        drive,
        schedule,
        fsm,
        collision,
        ctx: TrackerContext::new(&drive),
        lifecycle: Lifecycle::Running,
        last: None,
        bump_mask: None,
    })
}

impl<S, M> LineTrackerBuilder<S, M> {
    /// Fallible build in any type-state; names the missing peripheral.
    pub fn try_build(self) -> Result<LineTracker> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let motor = self
            .motor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let indicator = self
            .indicator
            .unwrap_or_else(|| Box::new(NullIndicator) as Box<dyn Indicator>);
        let buzzer = self
            .buzzer
            .unwrap_or_else(|| Box::new(SilentBuzzer) as Box<dyn Buzzer>);

        let cfg = TrackerCfg {
            pid: self.pid.unwrap_or_default(),
            drive: self.drive.unwrap_or_default(),
            schedule: self.schedule.unwrap_or_default(),
            fsm: self.fsm.unwrap_or_default(),
            collision: self.collision.unwrap_or_default(),
        };
        let inner = validate_and_build(sensor, motor, indicator, buzzer, cfg, self.clock)?;
        Ok(LineTracker { inner })
    }

    pub fn with_indicator(mut self, indicator: impl Indicator + 'static) -> Self {
        self.indicator = Some(Box::new(indicator));
        self
    }
    pub fn with_buzzer(mut self, buzzer: impl Buzzer + 'static) -> Self {
        self.buzzer = Some(Box::new(buzzer));
        self
    }
    pub fn with_pid(mut self, pid: PidCfg) -> Self {
        self.pid = Some(pid);
        self
    }
    pub fn with_drive(mut self, drive: DriveCfg) -> Self {
        self.drive = Some(drive);
        self
    }
    pub fn with_schedule(mut self, schedule: ScheduleCfg) -> Self {
        self.schedule = Some(schedule);
        self
    }
    pub fn with_fsm(mut self, fsm: FsmCfg) -> Self {
        self.fsm = Some(fsm);
        self
    }
    pub fn with_collision(mut self, collision: CollisionCfg) -> Self {
        self.collision = Some(collision);
        self
    }
    /// Apply every tuning section at once.
    pub fn with_cfg(self, cfg: TrackerCfg) -> Self {
        self.with_pid(cfg.pid)
            .with_drive(cfg.drive)
            .with_schedule(cfg.schedule)
            .with_fsm(cfg.fsm)
            .with_collision(cfg.collision)
    }
    /// Custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<M> LineTrackerBuilder<Missing, M> {
    pub fn with_sensor(self, sensor: impl LineSensor + 'static) -> LineTrackerBuilder<Set, M> {
        LineTrackerBuilder {
            sensor: Some(Box::new(sensor)),
            motor: self.motor,
            indicator: self.indicator,
            buzzer: self.buzzer,
            pid: self.pid,
            drive: self.drive,
            schedule: self.schedule,
            fsm: self.fsm,
            collision: self.collision,
            clock: self.clock,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

impl<S> LineTrackerBuilder<S, Missing> {
    pub fn with_motor(self, motor: impl Motor + 'static) -> LineTrackerBuilder<S, Set> {
        LineTrackerBuilder {
            sensor: self.sensor,
            motor: Some(Box::new(motor)),
            indicator: self.indicator,
            buzzer: self.buzzer,
            pid: self.pid,
            drive: self.drive,
            schedule: self.schedule,
            fsm: self.fsm,
            collision: self.collision,
            clock: self.clock,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

impl LineTrackerBuilder<Set, Set> {
    /// Validate and build. Only available once sensor and motor are set.
    pub fn build(self) -> Result<LineTracker> {
        self.try_build()
    }
}

/// Statically-dispatched tracker.
pub type LineTrackerG<S, M, I, B> = TrackerCore<S, M, I, B>;

/// Build a statically-dispatched tracker from concrete peripherals, with the
/// same validation as the builder.
pub fn build_tracker<S, M, I, B>(
    sensor: S,
    motor: M,
    indicator: I,
    buzzer: B,
    cfg: TrackerCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<LineTrackerG<S, M, I, B>>
where
    S: LineSensor,
    M: Motor,
    I: Indicator,
    B: Buzzer,
{
    validate_and_build(sensor, motor, indicator, buzzer, cfg, clock)
}
