//! Status values returned from the scheduler entry points.

use crate::fsm::{FsmState, Maneuver};
use crate::mixer::DutyCyclePair;
use crate::position::{Offset, SensorBitmap};

/// Everything derived from one completed acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Bitmap as returned by the sensor.
    pub raw: SensorBitmap,
    /// Bitmap the offset was estimated from.
    pub bitmap: SensorBitmap,
    pub offset: Offset,
    pub correction: f64,
    pub duty: DutyCyclePair,
    pub state: FsmState,
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    /// Nothing scheduled on this phase.
    Idle,
    /// Sensor acquisition started.
    Acquiring,
    /// Acquisition completed and the pipeline ran.
    Updated(Observation),
    /// A collision was handled; nothing runs any more.
    Halted,
}

/// Result of one control period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    Issued(Maneuver),
    Halted,
}
