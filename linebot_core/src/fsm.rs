//! Line-follower decision layer.
//!
//! Two pure functions: `transition` picks the next state from a reading, and
//! `action` says what a state does each control period. `evaluate` composes
//! them for callers that want both at once.

use linebot_traits::Color;

use crate::config::{FsmCfg, PatternCheck};
use crate::position::{LEFT_NIBBLE, Offset, RIGHT_NIBBLE, SensorBitmap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FsmState {
    #[default]
    Center,
    L1,
    L2,
    L3,
    R1,
    R2,
    R3,
    DeadEnd,
    LeftT,
}

impl FsmState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Center => "CENTER",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::DeadEnd => "DEAD_END",
            Self::LeftT => "LEFT_T",
        }
    }
}

impl core::fmt::Display for FsmState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Interpretation flags carried between control periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    /// Drop the leftmost sensor from the next readings.
    pub ignore_left: bool,
    /// Set while committed to a right branch. Tracked, not consulted.
    pub dead_right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Maneuver {
    Forward,
    PivotLeft,
    PivotRight,
    /// No motor command this period.
    Hold,
}

/// Requested LED colours; `None` leaves that LED as it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indicators {
    pub primary: Option<Color>,
    pub secondary: Option<Color>,
}

impl Indicators {
    const fn both(primary: Color, secondary: Color) -> Self {
        Self {
            primary: Some(primary),
            secondary: Some(secondary),
        }
    }
}

/// Per-period behaviour of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub maneuver: Maneuver,
    pub indicators: Indicators,
    pub ignore_left: Option<bool>,
    pub dead_right: Option<bool>,
    /// Reset both duty targets to nominal before commanding the motors.
    pub nominal_duty: bool,
}

impl Action {
    const HOLD: Self = Self {
        maneuver: Maneuver::Hold,
        indicators: Indicators {
            primary: None,
            secondary: None,
        },
        ignore_left: None,
        dead_right: None,
        nominal_duty: false,
    };

    pub fn apply_flags(&self, flags: ModeFlags) -> ModeFlags {
        ModeFlags {
            ignore_left: self.ignore_left.unwrap_or(flags.ignore_left),
            dead_right: self.dead_right.unwrap_or(flags.dead_right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub next_state: FsmState,
    pub action: Action,
    pub flags: ModeFlags,
}

/// Bitmap as seen by the rule table after `ignore_left` is applied.
#[inline]
pub fn rule_bitmap(raw: SensorBitmap, flags: ModeFlags) -> SensorBitmap {
    if flags.ignore_left {
        raw.shifted_right()
    } else {
        raw
    }
}

fn sharp_right(bitmap: SensorBitmap, check: PatternCheck) -> bool {
    match check {
        PatternCheck::FourBit => bitmap.has_all(RIGHT_NIBBLE),
        PatternCheck::LowBitOnly => bitmap.has_any(0x01),
    }
}

fn left_t(bitmap: SensorBitmap, check: PatternCheck) -> bool {
    match check {
        PatternCheck::FourBit => bitmap.has_all(LEFT_NIBBLE),
        PatternCheck::LowBitOnly => bitmap.has_any(0x01),
    }
}

/// Next state for one acquisition. `bitmap` is the rule bitmap (already
/// shifted when `ignore_left` is set). First matching rule wins.
pub fn transition(
    state: FsmState,
    bitmap: SensorBitmap,
    offset: Offset,
    cfg: &FsmCfg,
) -> FsmState {
    let band = cfg.center_band;
    let centred = -band < offset && offset < band;

    if state == FsmState::DeadEnd {
        return if centred {
            FsmState::Center
        } else {
            FsmState::DeadEnd
        };
    }
    if state == FsmState::R3 {
        return if band < offset && offset < cfg.recovery_limit {
            FsmState::R1
        } else {
            FsmState::R3
        };
    }
    if bitmap.is_empty() {
        FsmState::DeadEnd
    } else if sharp_right(bitmap, cfg.pattern_check) {
        FsmState::R3
    } else if left_t(bitmap, cfg.pattern_check) {
        FsmState::LeftT
    } else if offset >= band {
        FsmState::R1
    } else if offset <= -band {
        FsmState::L1
    } else if centred {
        FsmState::Center
    } else {
        FsmState::DeadEnd
    }
}

/// What `state` does each control period.
pub const fn action(state: FsmState) -> Action {
    use Color::*;
    match state {
        FsmState::Center => Action {
            maneuver: Maneuver::Forward,
            indicators: Indicators::both(Green, Green),
            ignore_left: Some(false),
            dead_right: None,
            nominal_duty: false,
        },
        FsmState::L1 => Action {
            maneuver: Maneuver::Forward,
            indicators: Indicators::both(Off, Yellow),
            ignore_left: Some(false),
            dead_right: Some(false),
            nominal_duty: false,
        },
        FsmState::R1 => Action {
            maneuver: Maneuver::Forward,
            indicators: Indicators::both(Yellow, Off),
            ignore_left: Some(false),
            dead_right: Some(true),
            nominal_duty: false,
        },
        FsmState::R3 => Action {
            maneuver: Maneuver::PivotRight,
            indicators: Indicators::both(Red, Red),
            ignore_left: Some(true),
            dead_right: Some(true),
            nominal_duty: false,
        },
        FsmState::LeftT => Action {
            maneuver: Maneuver::Forward,
            indicators: Indicators::both(Blue, Blue),
            ignore_left: Some(false),
            dead_right: Some(false),
            nominal_duty: true,
        },
        FsmState::DeadEnd => Action {
            maneuver: Maneuver::PivotLeft,
            indicators: Indicators {
                primary: None,
                secondary: Some(SkyBlue),
            },
            ignore_left: Some(false),
            dead_right: None,
            nominal_duty: false,
        },
        FsmState::L2 | FsmState::L3 | FsmState::R2 => Action::HOLD,
    }
}

/// Transition from `raw` under `flags`, then the new state's action and the
/// flags it leaves behind.
pub fn evaluate(
    state: FsmState,
    raw: SensorBitmap,
    offset: Offset,
    flags: ModeFlags,
    cfg: &FsmCfg,
) -> Decision {
    let next_state = transition(state, rule_bitmap(raw, flags), offset, cfg);
    let action = action(next_state);
    Decision {
        next_state,
        action,
        flags: action.apply_flags(flags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> FsmCfg {
        FsmCfg::default()
    }

    #[test]
    fn band_edges_are_exclusive_for_centre() {
        let b = SensorBitmap::new(0x18);
        assert_eq!(transition(FsmState::Center, b, 47, &cfg()), FsmState::Center);
        assert_eq!(transition(FsmState::Center, b, 48, &cfg()), FsmState::R1);
        assert_eq!(transition(FsmState::Center, b, -48, &cfg()), FsmState::L1);
    }

    #[test]
    fn r3_leaves_only_inside_recovery_window() {
        let b = SensorBitmap::new(0x02);
        assert_eq!(transition(FsmState::R3, b, 48, &cfg()), FsmState::R3);
        assert_eq!(transition(FsmState::R3, b, 49, &cfg()), FsmState::R1);
        assert_eq!(transition(FsmState::R3, b, 237, &cfg()), FsmState::R1);
        assert_eq!(transition(FsmState::R3, b, 238, &cfg()), FsmState::R3);
    }

    #[test]
    fn hold_states_leave_flags_alone() {
        let flags = ModeFlags {
            ignore_left: true,
            dead_right: true,
        };
        for s in [FsmState::L2, FsmState::L3, FsmState::R2] {
            let a = action(s);
            assert_eq!(a.maneuver, Maneuver::Hold);
            assert_eq!(a.apply_flags(flags), flags);
        }
    }

    #[test]
    fn centre_keeps_dead_right() {
        let flags = ModeFlags {
            ignore_left: true,
            dead_right: true,
        };
        let out = action(FsmState::Center).apply_flags(flags);
        assert!(!out.ignore_left);
        assert!(out.dead_right);
    }
}
