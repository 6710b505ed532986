//! The control core (`TrackerCore`).
//!
//! Owns the peripherals and every piece of mutable control state. The
//! scheduler calls `on_tick` at the tick rate and `on_control_period` at the
//! control rate; a bump calls `handle_collision`, after which both become
//! no-ops for good.

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use linebot_traits::clock::Clock;
use linebot_traits::{Buzzer, Indicator, Led, LineSensor, Motor};

use crate::collision::{self, DisengageReport};
use crate::config::*;
use crate::error::{Result, TrackerError};
use crate::fsm::{self, FsmState, Maneuver, ModeFlags};
use crate::hw_error::report;
use crate::mixer::{self, DutyCyclePair};
use crate::pid::{self, ControllerState};
use crate::position::{self, Offset, SensorBitmap};
use crate::status::{ControlStatus, Observation, TickStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Running,
    /// Entered once on collision; never left.
    Halted,
}

/// Mutable state shared by the acquisition path and the control period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerContext {
    pub controller: ControllerState,
    pub state: FsmState,
    pub flags: ModeFlags,
    pub duty: DutyCyclePair,
    /// Monotonic tick counter; wraps.
    pub tick: u64,
}

impl TrackerContext {
    pub fn new(drive: &DriveCfg) -> Self {
        Self {
            controller: ControllerState::default(),
            state: FsmState::Center,
            flags: ModeFlags::default(),
            duty: DutyCyclePair::splat(drive.nominal),
            tick: 0,
        }
    }
}

pub struct TrackerCore<S, M, I, B>
where
    S: LineSensor,
    M: Motor,
    I: Indicator,
    B: Buzzer,
{
    pub(crate) sensor: S,
    pub(crate) motor: M,
    pub(crate) indicator: I,
    pub(crate) buzzer: B,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) pid: PidCfg,
    pub(crate) drive: DriveCfg,
    pub(crate) schedule: ScheduleCfg,
    pub(crate) fsm: FsmCfg,
    pub(crate) collision: CollisionCfg,

    pub(crate) ctx: TrackerContext,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) last: Option<Observation>,
    pub(crate) bump_mask: Option<u8>,
}

impl<S, M, I, B> core::fmt::Debug for TrackerCore<S, M, I, B>
where
    S: LineSensor,
    M: Motor,
    I: Indicator,
    B: Buzzer,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrackerCore")
            .field("state", &self.ctx.state)
            .field("flags", &self.ctx.flags)
            .field("duty", &self.ctx.duty)
            .field("tick", &self.ctx.tick)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl<S, M, I, B> TrackerCore<S, M, I, B>
where
    S: LineSensor,
    M: Motor,
    I: Indicator,
    B: Buzzer,
{
    pub fn state(&self) -> FsmState {
        self.ctx.state
    }

    pub fn flags(&self) -> ModeFlags {
        self.ctx.flags
    }

    pub fn duty(&self) -> DutyCyclePair {
        self.ctx.duty
    }

    pub fn context(&self) -> &TrackerContext {
        &self.ctx
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_halted(&self) -> bool {
        self.lifecycle == Lifecycle::Halted
    }

    pub fn last_observation(&self) -> Option<Observation> {
        self.last
    }

    /// Mask of the bump that halted the robot, if any.
    pub fn bump_mask(&self) -> Option<u8> {
        self.bump_mask
    }

    pub fn schedule_cfg(&self) -> &ScheduleCfg {
        &self.schedule
    }

    /// Bring up the peripherals and reset to the power-on state. Call once
    /// before the first tick.
    pub fn init(&mut self) -> Result<()> {
        self.sensor
            .init()
            .map_err(report)
            .wrap_err("initialising line sensor")?;
        self.motor
            .init()
            .map_err(report)
            .wrap_err("initialising motors")?;
        self.ctx = TrackerContext::new(&self.drive);
        self.lifecycle = Lifecycle::Running;
        self.last = None;
        self.bump_mask = None;
        tracing::debug!(
            nominal = self.drive.nominal,
            swing = self.drive.swing,
            "tracker initialised"
        );
        Ok(())
    }

    /// One scheduler tick. Starts an acquisition on the start phase and
    /// completes it, running the whole pipeline, on the end phase.
    pub fn on_tick(&mut self) -> Result<TickStatus> {
        if self.is_halted() {
            return Ok(TickStatus::Halted);
        }
        self.ctx.tick = self.ctx.tick.wrapping_add(1);
        let every = u64::from(self.schedule.acquisition_every.max(1));
        let phase = self.ctx.tick % every;

        if phase == u64::from(ScheduleCfg::START_PHASE) {
            self.sensor
                .start()
                .map_err(report)
                .wrap_err("starting acquisition")?;
            Ok(TickStatus::Acquiring)
        } else if phase == u64::from(ScheduleCfg::END_PHASE) {
            let raw = self
                .sensor
                .end()
                .map_err(report)
                .wrap_err("completing acquisition")?;
            let obs = self.step_from_bitmap(SensorBitmap::new(raw));
            Ok(TickStatus::Updated(obs))
        } else {
            Ok(TickStatus::Idle)
        }
    }

    /// Run estimator, corrector, transition and mixer on one reading.
    ///
    /// Used by `on_tick` on the end phase; exposed for driving the pipeline
    /// from pre-sampled bitmaps.
    pub fn step_from_bitmap(&mut self, raw: SensorBitmap) -> Observation {
        let rule_bitmap = fsm::rule_bitmap(raw, self.ctx.flags);
        let bitmap = match self.fsm.ignore_left_scope {
            IgnoreLeftScope::PositionAndPatterns => rule_bitmap,
            IgnoreLeftScope::PatternsOnly => raw,
        };
        let offset = position::estimate(bitmap);
        let correction = pid::correct(&mut self.ctx.controller, &self.pid, offset);

        let prev = self.ctx.state;
        let next = fsm::transition(prev, rule_bitmap, offset, &self.fsm);
        if next != prev {
            tracing::debug!(from = %prev, to = %next, bitmap = %raw, offset, "state change");
        }
        self.ctx.state = next;
        self.ctx.duty = mixer::mix(&self.drive, correction);

        tracing::trace!(
            bitmap = %raw,
            offset,
            correction,
            left = self.ctx.duty.left,
            right = self.ctx.duty.right,
            "acquisition"
        );

        let obs = Observation {
            raw,
            bitmap,
            offset,
            correction,
            duty: self.ctx.duty,
            state: next,
        };
        self.last = Some(obs);
        obs
    }

    /// Apply the current state's action: indicators, flags, then motors.
    pub fn on_control_period(&mut self) -> Result<ControlStatus> {
        if self.is_halted() {
            return Ok(ControlStatus::Halted);
        }
        let action = fsm::action(self.ctx.state);

        if let Some(color) = action.indicators.primary {
            self.indicator
                .set(Led::Primary, color)
                .map_err(report)
                .wrap_err("setting primary LED")?;
        }
        if let Some(color) = action.indicators.secondary {
            self.indicator
                .set(Led::Secondary, color)
                .map_err(report)
                .wrap_err("setting secondary LED")?;
        }

        self.ctx.flags = action.apply_flags(self.ctx.flags);
        if action.nominal_duty {
            self.ctx.duty = DutyCyclePair::splat(self.drive.nominal);
        }

        let DutyCyclePair { left, right } = self.ctx.duty;
        let r = match action.maneuver {
            Maneuver::Forward => self.motor.forward(left, right),
            Maneuver::PivotLeft => self.motor.left(left, right),
            Maneuver::PivotRight => self.motor.right(left, right),
            Maneuver::Hold => Ok(()),
        };
        r.map_err(report)
            .wrap_err_with(|| format!("commanding {:?} in {}", action.maneuver, self.ctx.state))?;

        Ok(ControlStatus::Issued(action.maneuver))
    }

    /// React to a bump. A zero mask is ignored. The first non-zero mask halts
    /// the core before any motor is touched, runs the disengagement sequence
    /// and leaves the robot stopped; later calls do nothing.
    pub fn handle_collision(&mut self, mask: u8) -> Option<DisengageReport> {
        if mask == 0 || self.is_halted() {
            return None;
        }
        self.lifecycle = Lifecycle::Halted;
        self.bump_mask = Some(mask);
        tracing::error!(
            mask,
            state = %self.ctx.state,
            "collision detected, disengaging"
        );

        let report = collision::disengage(
            &mut self.motor,
            &mut self.indicator,
            &mut self.buzzer,
            &*self.clock,
            &self.collision,
        );
        if report.failures > 0 {
            tracing::warn!(failures = report.failures, "disengage finished with failures");
        } else {
            tracing::info!("disengage finished, halted");
        }
        Some(report)
    }

    /// Single-shot reading outside the scheduler. Does not touch control state.
    pub fn probe(&mut self, wait: Duration) -> Result<(SensorBitmap, Offset)> {
        if self.is_halted() {
            return Err(eyre::Report::new(TrackerError::State(
                "tracker is halted".into(),
            )));
        }
        let raw = self
            .sensor
            .read(wait)
            .map_err(report)
            .wrap_err("reading line sensor")?;
        let bitmap = SensorBitmap::new(raw);
        Ok((bitmap, position::estimate(bitmap)))
    }

    /// Stop the motors (best-effort caller side).
    pub fn motor_stop(&mut self) -> Result<()> {
        self.motor
            .stop()
            .map_err(report)
            .wrap_err("stopping motors")
    }
}
