//! PID corrector over the lateral offset.

use crate::config::PidCfg;
use crate::position::Offset;

/// Accumulated controller memory. Lives for the whole run and is never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    pub integral: f64,
    pub previous_error: f64,
}

/// One PID step. `error = desired - measured`; the integral term accumulates
/// `ki * error` (inert while `ki == 0`).
pub fn correct(state: &mut ControllerState, gains: &PidCfg, measured: Offset) -> f64 {
    let error = gains.desired - f64::from(measured);
    let proportional = gains.kp * error;
    state.integral += gains.ki * error;
    let derivative = gains.kd * (error - state.previous_error);
    state.previous_error = error;
    proportional + state.integral + derivative
}
