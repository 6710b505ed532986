use std::time::{Duration, Instant};

use linebot_hardware::util::{Debouncer, pack_levels, rgb};
use linebot_traits::Color;
use rstest::rstest;

#[rstest]
#[case([false; 8], 0x00)]
#[case([true, false, false, false, false, false, false, false], 0x01)]
#[case([false, false, false, true, true, false, false, false], 0x18)]
#[case([false, false, false, false, false, false, false, true], 0x80)]
#[case([true; 8], 0xFF)]
fn levels_pack_lsb_first(#[case] levels: [bool; 8], #[case] expected: u8) {
    assert_eq!(pack_levels(levels), expected);
}

#[test]
fn extra_levels_are_ignored() {
    assert_eq!(pack_levels(vec![true; 12]), 0xFF);
}

#[rstest]
#[case(Color::Off, [false, false, false])]
#[case(Color::Yellow, [true, true, false])]
#[case(Color::SkyBlue, [false, true, true])]
fn rgb_mixes(#[case] c: Color, #[case] expected: [bool; 3]) {
    assert_eq!(rgb(c), expected);
}

#[test]
fn debouncer_drops_chatter() {
    let mut d = Debouncer::new(Duration::from_millis(5));
    let t0 = Instant::now();
    assert!(d.accept(t0));
    assert!(!d.accept(t0 + Duration::from_millis(1)));
    assert!(!d.accept(t0 + Duration::from_millis(4)));
    assert!(d.accept(t0 + Duration::from_millis(5)));
}
