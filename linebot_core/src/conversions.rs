//! `From` implementations bridging `linebot_config` types to core types.

use std::time::Duration;

use crate::builder::TrackerCfg;
use crate::config::{
    CollisionCfg, DriveCfg, FsmCfg, IgnoreLeftScope, PatternCheck, PidCfg, ScheduleCfg,
};

// ── PID ──────────────────────────────────────────────────────────────────────

impl From<&linebot_config::PidCfg> for PidCfg {
    fn from(c: &linebot_config::PidCfg) -> Self {
        Self {
            kp: c.kp,
            ki: c.ki,
            kd: c.kd,
            desired: c.desired,
        }
    }
}

// ── Drive ────────────────────────────────────────────────────────────────────

impl From<&linebot_config::DriveCfg> for DriveCfg {
    fn from(c: &linebot_config::DriveCfg) -> Self {
        Self {
            nominal: c.nominal,
            swing: c.swing,
        }
    }
}

// ── Schedule ─────────────────────────────────────────────────────────────────

impl From<&linebot_config::ScheduleCfg> for ScheduleCfg {
    fn from(c: &linebot_config::ScheduleCfg) -> Self {
        Self {
            tick_hz: c.tick_hz,
            acquisition_every: c.acquisition_every,
            control_hz: c.control_hz,
        }
    }
}

// ── FSM ──────────────────────────────────────────────────────────────────────

impl From<linebot_config::PatternCheck> for PatternCheck {
    fn from(c: linebot_config::PatternCheck) -> Self {
        match c {
            linebot_config::PatternCheck::FourBit => Self::FourBit,
            linebot_config::PatternCheck::LowBitOnly => Self::LowBitOnly,
        }
    }
}

impl From<linebot_config::IgnoreLeftScope> for IgnoreLeftScope {
    fn from(c: linebot_config::IgnoreLeftScope) -> Self {
        match c {
            linebot_config::IgnoreLeftScope::PositionAndPatterns => Self::PositionAndPatterns,
            linebot_config::IgnoreLeftScope::PatternsOnly => Self::PatternsOnly,
        }
    }
}

impl From<&linebot_config::FsmCfg> for FsmCfg {
    fn from(c: &linebot_config::FsmCfg) -> Self {
        Self {
            pattern_check: c.pattern_check.into(),
            ignore_left_scope: c.ignore_left_scope.into(),
            center_band: c.center_band,
            recovery_limit: c.recovery_limit,
        }
    }
}

// ── Collision ────────────────────────────────────────────────────────────────

impl From<&linebot_config::CollisionCfg> for CollisionCfg {
    fn from(c: &linebot_config::CollisionCfg) -> Self {
        Self {
            stop_hold: Duration::from_millis(c.stop_hold_ms),
            flash_count: c.flash_count,
            flash_interval: Duration::from_millis(c.flash_interval_ms),
            reverse_duty: c.reverse_duty,
            reverse_for: Duration::from_millis(c.reverse_ms),
            settle_for: Duration::from_millis(c.settle_ms),
            pivot_duty: c.pivot_duty,
            pivot_for: Duration::from_millis(c.pivot_ms),
            play_tune: c.play_tune,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&linebot_config::Config> for TrackerCfg {
    fn from(c: &linebot_config::Config) -> Self {
        Self {
            pid: (&c.pid).into(),
            drive: (&c.drive).into(),
            schedule: (&c.schedule).into(),
            fsm: (&c.fsm).into(),
            collision: (&c.collision).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_agree() {
        let from_file = TrackerCfg::from(&linebot_config::Config::default());
        assert_eq!(from_file, TrackerCfg::default());
    }
}
