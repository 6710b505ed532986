//! Differential drive mixer.

use crate::config::DriveCfg;
use crate::fixed_point::{clamp_to_u16, truncate_to_i64};

/// Target PWM duty per wheel. Always inside `[DriveCfg::min, DriveCfg::max]`
/// when produced by `mix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCyclePair {
    pub left: u16,
    pub right: u16,
}

impl DutyCyclePair {
    pub const fn splat(duty: u16) -> Self {
        Self {
            left: duty,
            right: duty,
        }
    }
}

/// Steer by adding the correction to the right wheel and subtracting it from
/// the left, then clamp each wheel into the drive band.
///
/// The correction is truncated toward zero before mixing.
pub fn mix(drive: &DriveCfg, correction: f64) -> DutyCyclePair {
    let c = truncate_to_i64(correction);
    let nominal = i64::from(drive.nominal);
    let (lo, hi) = (drive.min(), drive.max());
    DutyCyclePair {
        left: clamp_to_u16(nominal.saturating_sub(c), lo, hi),
        right: clamp_to_u16(nominal.saturating_add(c), lo, hi),
    }
}
