use linebot_core::fsm::{Maneuver, ModeFlags, action, evaluate, transition};
use linebot_core::position::{SensorBitmap, estimate};
use linebot_core::{FsmCfg, FsmState, PatternCheck};
use linebot_traits::Color;
use proptest::prelude::*;
use rstest::rstest;

fn four_bit() -> FsmCfg {
    FsmCfg::default()
}

fn low_bit() -> FsmCfg {
    FsmCfg {
        pattern_check: PatternCheck::LowBitOnly,
        ..FsmCfg::default()
    }
}

#[rstest]
#[case::centred(FsmState::Center, 0x18, 0, FsmState::Center, Maneuver::Forward)]
#[case::right_edge(FsmState::Center, 0x01, 334, FsmState::R1, Maneuver::Forward)]
#[case::line_lost(FsmState::Center, 0x00, 335, FsmState::DeadEnd, Maneuver::PivotLeft)]
#[case::dead_end_recovers(FsmState::DeadEnd, 0x18, 0, FsmState::Center, Maneuver::Forward)]
#[case::dead_end_waits(FsmState::DeadEnd, 0x03, 286, FsmState::DeadEnd, Maneuver::PivotLeft)]
#[case::sharp_right(FsmState::Center, 0x0F, 190, FsmState::R3, Maneuver::PivotRight)]
#[case::left_t(FsmState::Center, 0xF0, -190, FsmState::LeftT, Maneuver::Forward)]
#[case::drift_left(FsmState::R1, 0x30, -95, FsmState::L1, Maneuver::Forward)]
#[case::r3_recovers(FsmState::R3, 0x06, 190, FsmState::R1, Maneuver::Forward)]
#[case::r3_holds_centred(FsmState::R3, 0x18, 0, FsmState::R3, Maneuver::PivotRight)]
#[case::full_bar(FsmState::Center, 0xFF, 0, FsmState::R3, Maneuver::PivotRight)]
fn four_bit_scenarios(
    #[case] from: FsmState,
    #[case] bits: u8,
    #[case] offset: i32,
    #[case] to: FsmState,
    #[case] maneuver: Maneuver,
) {
    let d = evaluate(
        from,
        SensorBitmap::new(bits),
        offset,
        ModeFlags::default(),
        &four_bit(),
    );
    assert_eq!(d.next_state, to);
    assert_eq!(d.action.maneuver, maneuver);
}

#[rstest]
#[case::right_edge_is_sharp(0x01, 334, FsmState::R3)]
#[case::right_nibble_without_low_bit(0x0E, 142, FsmState::R1)]
#[case::left_nibble_is_plain_drift(0xF0, -190, FsmState::L1)]
#[case::left_nibble_with_low_bit(0xF1, -85, FsmState::R3)]
fn low_bit_only_reproduces_literal_precedence(
    #[case] bits: u8,
    #[case] offset: i32,
    #[case] to: FsmState,
) {
    assert_eq!(
        transition(FsmState::Center, SensorBitmap::new(bits), offset, &low_bit()),
        to
    );
}

#[test]
fn left_t_is_unreachable_with_low_bit_only() {
    for state in [
        FsmState::Center,
        FsmState::L1,
        FsmState::R1,
        FsmState::LeftT,
    ] {
        for bits in 0u8..=255 {
            let b = SensorBitmap::new(bits);
            assert_ne!(
                transition(state, b, estimate(b), &low_bit()),
                FsmState::LeftT,
                "{state} {b}"
            );
        }
    }
}

#[test]
fn ignore_left_hides_leftmost_sensor_from_rules() {
    let flags = ModeFlags {
        ignore_left: true,
        dead_right: true,
    };
    // 0x80 alone shifts to 0x40: still on the line, so not a dead end.
    let d = evaluate(FsmState::Center, SensorBitmap::new(0x80), -238, flags, &four_bit());
    assert_eq!(d.next_state, FsmState::L1);
    // 0x01 alone shifts out entirely.
    let d = evaluate(FsmState::Center, SensorBitmap::new(0x01), 335, flags, &four_bit());
    assert_eq!(d.next_state, FsmState::DeadEnd);
}

#[test]
fn action_table() {
    let a = action(FsmState::Center);
    assert_eq!(a.indicators.primary, Some(Color::Green));
    assert_eq!(a.indicators.secondary, Some(Color::Green));

    let a = action(FsmState::R3);
    assert_eq!(a.maneuver, Maneuver::PivotRight);
    assert_eq!((a.ignore_left, a.dead_right), (Some(true), Some(true)));

    let a = action(FsmState::R1);
    assert_eq!((a.ignore_left, a.dead_right), (Some(false), Some(true)));
    assert_eq!(a.indicators.primary, Some(Color::Yellow));
    assert_eq!(a.indicators.secondary, Some(Color::Off));

    let a = action(FsmState::L1);
    assert_eq!((a.ignore_left, a.dead_right), (Some(false), Some(false)));

    let a = action(FsmState::LeftT);
    assert!(a.nominal_duty);
    assert_eq!(a.indicators.primary, Some(Color::Blue));

    let a = action(FsmState::DeadEnd);
    assert_eq!(a.maneuver, Maneuver::PivotLeft);
    assert_eq!(a.indicators.primary, None);
    assert_eq!(a.indicators.secondary, Some(Color::SkyBlue));
    assert_eq!(a.dead_right, None);
}

#[test]
fn decision_carries_updated_flags() {
    let d = evaluate(
        FsmState::Center,
        SensorBitmap::new(0x0F),
        190,
        ModeFlags::default(),
        &four_bit(),
    );
    assert_eq!(
        d.flags,
        ModeFlags {
            ignore_left: true,
            dead_right: true
        }
    );
}

fn any_state() -> impl Strategy<Value = FsmState> {
    prop_oneof![
        Just(FsmState::Center),
        Just(FsmState::L1),
        Just(FsmState::L2),
        Just(FsmState::L3),
        Just(FsmState::R1),
        Just(FsmState::R2),
        Just(FsmState::R3),
        Just(FsmState::DeadEnd),
        Just(FsmState::LeftT),
    ]
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(
        state in any_state(),
        bits in any::<u8>(),
        offset in -400i32..=400,
        ignore_left in any::<bool>(),
        dead_right in any::<bool>(),
    ) {
        let flags = ModeFlags { ignore_left, dead_right };
        let b = SensorBitmap::new(bits);
        let first = evaluate(state, b, offset, flags, &four_bit());
        for _ in 0..3 {
            prop_assert_eq!(evaluate(state, b, offset, flags, &four_bit()), first);
        }
    }

    #[test]
    fn transitions_never_enter_hold_states(
        state in any_state(),
        bits in any::<u8>(),
        offset in -400i32..=400,
    ) {
        let next = transition(state, SensorBitmap::new(bits), offset, &four_bit());
        prop_assert!(!matches!(next, FsmState::L2 | FsmState::L3 | FsmState::R2));
    }
}
