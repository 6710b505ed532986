//! Peripheral backends for the line follower.
//!
//! The simulated set (`sim`) is always built and is what the CLI uses by
//! default. The `hardware` feature adds rppal-backed GPIO drivers (`gpio`).

pub mod error;
pub mod pwm;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod gpio;

pub use error::HwError;
pub use pwm::{Channel, PwmTimer};
pub use sim::{
    DEFAULT_HISTORY, IndicatorProbe, MotorCommand, MotorProbe, ScriptedBumps, ScriptedLineSensor,
    SimBuzzer,
    SimIndicator, SimMotor, ToneProbe,
};
