#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core line-following logic (hardware-agnostic).
//!
//! All hardware goes through the `linebot_traits` contracts: `LineSensor`,
//! `Motor`, `Indicator`, `Buzzer`, `TickSource` and `BumpSource`.
//!
//! ## Architecture
//!
//! - **Position**: bitmap to lateral offset (`position`)
//! - **Correction**: PID over the offset (`pid`)
//! - **Drive**: correction to per-wheel duty (`mixer`)
//! - **Decisions**: rule table and per-state actions (`fsm`)
//! - **Collision**: one-shot disengagement sequence (`collision`)
//! - **Scheduling**: tick phases and control period (`tracker`), thread ticker
//!   and event loop (`ticker`, `runner`)
//!
//! ## Units
//!
//! Offsets are `i32` in 0.1 mm; duties are `u16` PWM timer counts.

pub mod builder;
pub mod collision;
pub mod config;
pub mod conversions;
pub mod error;
pub mod fixed_point;
pub mod fsm;
pub mod hw_error;
pub mod mixer;
pub mod mocks;
pub mod pid;
pub mod position;
pub mod runner;
pub mod status;
pub mod ticker;
pub mod tracker;
pub mod util;

pub use builder::{LineTracker, LineTrackerBuilder, LineTrackerG, TrackerCfg, build_tracker};
pub use config::{
    CollisionCfg, DriveCfg, FsmCfg, IgnoreLeftScope, PatternCheck, PidCfg, ScheduleCfg,
};
pub use error::{BuildError, Report, Result, TrackerError};
pub use fsm::{Action, Decision, FsmState, Indicators, Maneuver, ModeFlags};
pub use mixer::DutyCyclePair;
pub use position::{OFF_ROAD_OFFSET, Offset, SensorBitmap};
pub use status::{ControlStatus, Observation, TickStatus};
pub use tracker::{Lifecycle, TrackerContext, TrackerCore};
