//! Runtime configuration for the control core.
//!
//! Defaults reproduce the firmware constants. These are separate from the
//! TOML-deserialized schema in `linebot_config`; see `conversions`.

use std::time::Duration;

/// PID gains and set-point. Offsets are fed in 0.1 mm units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidCfg {
    pub kp: f64,
    /// Integral gain. Zero in the shipped tuning, which leaves the
    /// accumulator permanently at 0.
    pub ki: f64,
    pub kd: f64,
    /// Desired offset; the line centred under the array.
    pub desired: f64,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            kp: 20.0,
            ki: 0.0,
            kd: 1.0,
            desired: 0.0,
        }
    }
}

/// Duty-cycle band for the differential drive (PWM timer counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveCfg {
    pub nominal: u16,
    pub swing: u16,
}

impl DriveCfg {
    #[inline]
    pub const fn min(&self) -> u16 {
        self.nominal.saturating_sub(self.swing)
    }

    #[inline]
    pub const fn max(&self) -> u16 {
        self.nominal.saturating_add(self.swing)
    }
}

impl Default for DriveCfg {
    fn default() -> Self {
        Self {
            nominal: 3500,
            swing: 3000,
        }
    }
}

/// Tick phases of the acquisition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleCfg {
    /// Scheduler tick rate.
    pub tick_hz: u32,
    /// Ticks per acquisition cycle; `start` fires at phase 1, `end` at phase 2.
    pub acquisition_every: u32,
    /// Rate of the independent state-machine control period.
    pub control_hz: u32,
}

impl ScheduleCfg {
    pub const START_PHASE: u32 = 1;
    pub const END_PHASE: u32 = 2;

    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(crate::util::period_us(self.tick_hz))
    }

    pub fn control_period(&self) -> Duration {
        Duration::from_micros(crate::util::period_us(self.control_hz))
    }
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            tick_hz: 1000,
            acquisition_every: 10,
            control_hz: 1000,
        }
    }
}

/// How the sharp-right and left-T patterns are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternCheck {
    /// All four sensors of the nibble must be dark.
    #[default]
    FourBit,
    /// The firmware's literal precedence: `bits & (0x0F == 0x0F)`, i.e. only
    /// the rightmost sensor is tested, for both patterns. `LEFT_T` becomes
    /// unreachable because the sharp-right rule fires first.
    LowBitOnly,
}

/// Which consumers see the bitmap after `ignore_left` shifts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnoreLeftScope {
    /// Shift before estimating the offset; the rule table sees the same bitmap.
    #[default]
    PositionAndPatterns,
    /// Offset comes from the raw bitmap; only the rule table sees the shift.
    PatternsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsmCfg {
    pub pattern_check: PatternCheck,
    pub ignore_left_scope: IgnoreLeftScope,
    /// Half-width of the centre band (exclusive).
    pub center_band: i32,
    /// Upper bound (exclusive) for leaving R3 towards R1.
    pub recovery_limit: i32,
}

impl Default for FsmCfg {
    fn default() -> Self {
        Self {
            pattern_check: PatternCheck::default(),
            ignore_left_scope: IgnoreLeftScope::default(),
            center_band: 48,
            recovery_limit: 238,
        }
    }
}

/// Timings and duties of the disengagement choreography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionCfg {
    /// Pause after the initial stop.
    pub stop_hold: Duration,
    pub flash_count: u32,
    /// Each flash half (off, then red) lasts this long.
    pub flash_interval: Duration,
    pub reverse_duty: u16,
    pub reverse_for: Duration,
    /// Pause after stopping from reverse.
    pub settle_for: Duration,
    pub pivot_duty: u16,
    pub pivot_for: Duration,
    pub play_tune: bool,
}

impl Default for CollisionCfg {
    fn default() -> Self {
        Self {
            stop_hold: Duration::from_millis(1000),
            flash_count: 5,
            flash_interval: Duration::from_millis(200),
            reverse_duty: 4500,
            reverse_for: Duration::from_millis(500),
            settle_for: Duration::from_millis(500),
            pivot_duty: 4500,
            pivot_for: Duration::from_millis(1300),
            play_tune: true,
        }
    }
}
