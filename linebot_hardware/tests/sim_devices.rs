use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use linebot_config::{Track, TrackRow};
use linebot_hardware::{
    DEFAULT_HISTORY, MotorCommand, ScriptedBumps, ScriptedLineSensor, SimBuzzer, SimIndicator,
    SimMotor,
};
use linebot_traits::clock::test_clock::TestClock;
use linebot_traits::{BumpSource, Buzzer, Color, Indicator, Led, LineSensor, Motor};
use rstest::rstest;

fn track(rows: &[(u32, u8)]) -> Track {
    Track::from_rows(
        rows.iter()
            .map(|&(cycles, bitmap)| TrackRow { cycles, bitmap })
            .collect(),
    )
    .unwrap()
}

#[test]
fn motor_records_commands_and_keeps_duty_on_overflow() {
    let mut m = SimMotor::new(15_000);
    let probe = m.probe();
    m.init().unwrap();

    m.forward(6500, 500).unwrap();
    assert_eq!(probe.duties(), (6500, 500));

    // Left duty reaches the period and is dropped; right still updates.
    m.forward(15_000, 3500).unwrap();
    assert_eq!(probe.duties(), (6500, 3500));
    assert!(probe.is_enabled());

    m.stop().unwrap();
    assert_eq!(probe.duties(), (0, 0));
    assert!(!probe.is_enabled());
    assert_eq!(
        probe.commands(),
        vec![
            MotorCommand::Forward { left: 6500, right: 500 },
            MotorCommand::Forward { left: 15_000, right: 3500 },
            MotorCommand::Stop,
        ]
    );
}

#[test]
fn motor_rejects_drive_before_init() {
    let mut m = SimMotor::default();
    let err = m.left(3500, 3500).unwrap_err();
    assert!(err.to_string().contains("before init"));
    // Stopping is always allowed.
    m.stop().unwrap();
}

#[rstest]
#[case(&[(2, 0x18), (1, 0x0C), (3, 0x80)], &[0x18, 0x18, 0x0C, 0x80, 0x80, 0x80, 0x80, 0x80])]
#[case(&[(1, 0x00)], &[0x00, 0x00, 0x00])]
#[case(&[(1, 0x01), (1, 0x02), (1, 0x04)], &[0x01, 0x02, 0x04, 0x04])]
fn sensor_replays_script_and_holds_last(#[case] rows: &[(u32, u8)], #[case] expected: &[u8]) {
    let mut s = ScriptedLineSensor::new(track(rows));
    s.init().unwrap();
    let got: Vec<u8> = expected
        .iter()
        .map(|_| s.read(Duration::ZERO).unwrap())
        .collect();
    assert_eq!(got, expected);
    assert_eq!(s.reads(), expected.len() as u64);
}

#[test]
fn sensor_end_without_start_is_an_error() {
    let mut s = ScriptedLineSensor::new(Track::builtin());
    s.start().unwrap();
    s.end().unwrap();
    let err = s.end().unwrap_err();
    assert!(err.to_string().contains("without start"));
}

#[test]
fn indicator_tracks_current_colors() {
    let mut ind = SimIndicator::new();
    let probe = ind.probe();
    assert_eq!(probe.current(Led::Primary), None);

    ind.set(Led::Primary, Color::Green).unwrap();
    ind.set(Led::Secondary, Color::Blue).unwrap();
    ind.set(Led::Primary, Color::Red).unwrap();

    assert_eq!(probe.current(Led::Primary), Some(Color::Red));
    assert_eq!(probe.current(Led::Secondary), Some(Color::Blue));
    assert_eq!(probe.history().len(), 3);
}

#[test]
fn motor_history_is_capped() {
    let mut motor = SimMotor::new(15_000).with_history(4);
    let probe = motor.probe();
    motor.init().unwrap();
    for duty in 1..=10u16 {
        motor.forward(duty, duty).unwrap();
    }
    let cmds = probe.commands();
    assert_eq!(cmds.len(), 4);
    assert_eq!(cmds[0], MotorCommand::Forward { left: 7, right: 7 });
    assert_eq!(probe.last(), Some(MotorCommand::Forward { left: 10, right: 10 }));
}

#[test]
fn default_history_holds_through_a_long_run() {
    let mut motor = SimMotor::default();
    let mut ind = SimIndicator::new();
    let (motor_probe, ind_probe) = (motor.probe(), ind.probe());
    motor.init().unwrap();
    for _ in 0..DEFAULT_HISTORY * 3 {
        motor.forward(3500, 3500).unwrap();
        ind.set(Led::Primary, Color::Green).unwrap();
        ind.set(Led::Secondary, Color::Off).unwrap();
    }
    assert_eq!(motor_probe.commands().len(), DEFAULT_HISTORY);
    assert_eq!(ind_probe.history().len(), DEFAULT_HISTORY);
}

#[test]
fn zero_history_records_nothing_but_tracks_state() {
    let mut motor = SimMotor::default().with_history(0);
    let mut ind = SimIndicator::new().with_history(0);
    let (motor_probe, ind_probe) = (motor.probe(), ind.probe());
    motor.init().unwrap();
    motor.left(1000, 2000).unwrap();
    ind.set(Led::Primary, Color::Yellow).unwrap();

    assert!(motor_probe.commands().is_empty());
    assert_eq!(motor_probe.last(), Some(MotorCommand::Left { left: 1000, right: 2000 }));
    assert_eq!(motor_probe.duties(), (1000, 2000));
    assert!(ind_probe.history().is_empty());
    assert_eq!(ind_probe.current(Led::Primary), Some(Color::Yellow));
}

#[test]
fn buzzer_blocks_on_attached_clock() {
    let clock = TestClock::new();
    let mut b = SimBuzzer::new().with_clock(Arc::new(clock.clone()));
    let probe = b.probe();

    b.play_tone(429, Duration::from_millis(250)).unwrap();
    b.play_tone(285, Duration::from_millis(100)).unwrap();

    assert_eq!(clock.elapsed(), Duration::from_millis(350));
    assert_eq!(probe.total_duration(), Duration::from_millis(350));
    assert_eq!(probe.tones()[0].0, 429);
}

#[test]
fn scripted_bump_fires_once() {
    let seen = Arc::new(AtomicU8::new(0));
    let seen2 = seen.clone();
    let mut bumps = ScriptedBumps::new(Duration::from_millis(10), 0x21);
    bumps
        .subscribe(Box::new(move |m| {
            seen2.fetch_add(m, Ordering::SeqCst);
        }))
        .unwrap();

    std::thread::sleep(Duration::from_millis(60));
    drop(bumps);
    assert_eq!(seen.load(Ordering::SeqCst), 0x21);
}

#[test]
fn dropping_scripted_bumps_cancels_pending_bump() {
    let seen = Arc::new(AtomicU8::new(0));
    let seen2 = seen.clone();
    let mut bumps = ScriptedBumps::new(Duration::from_secs(30), 0x01);
    bumps
        .subscribe(Box::new(move |m| {
            seen2.store(m, Ordering::SeqCst);
        }))
        .unwrap();
    drop(bumps);
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn scripted_bumps_subscribe_only_once() {
    let mut bumps = ScriptedBumps::new(Duration::from_secs(30), 0x01);
    bumps.subscribe(Box::new(|_| {})).unwrap();
    assert!(bumps.subscribe(Box::new(|_| {})).is_err());
}
