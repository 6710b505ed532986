mod common;

use common::{Log, ScriptSensor};
use linebot_core::error::TrackerError;
use linebot_core::hw_error::map_hw_error;
use linebot_core::{FsmCfg, LineTracker};
use linebot_hardware::error::HwError;
use linebot_traits::clock::test_clock::TestClock;
use linebot_traits::{HwResult, Motor};

struct PwmFaultMotor;

impl Motor for PwmFaultMotor {
    fn forward(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Err(Box::new(HwError::Pwm("channel 1 stalled".into())))
    }
    fn backward(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Ok(())
    }
    fn left(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Ok(())
    }
    fn right(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Ok(())
    }
    fn stop(&mut self) -> HwResult<()> {
        Ok(())
    }
}

#[test]
fn pwm_faults_are_typed_hardware_faults() {
    let log = Log::new(TestClock::new());
    let mut t = LineTracker::builder()
        .with_sensor(ScriptSensor::new(log, &[0x18]))
        .with_motor(PwmFaultMotor)
        .with_fsm(FsmCfg::default())
        .build()
        .unwrap();
    t.init().unwrap();
    let err = t.on_control_period().expect_err("forward fails");
    match err.downcast_ref::<TrackerError>() {
        Some(TrackerError::HardwareFault(msg)) => assert!(msg.contains("stalled")),
        other => panic!("expected HardwareFault, got {other:?}"),
    }
}

#[test]
fn script_errors_map_to_plain_hardware_errors() {
    let e = HwError::Script("track exhausted".into());
    assert!(matches!(map_hw_error(&e), TrackerError::Hardware(_)));
}

#[test]
fn sensor_errors_carry_context() {
    struct DeadSensor;
    impl linebot_traits::LineSensor for DeadSensor {
        fn start(&mut self) -> HwResult<()> {
            Err("emitter open circuit".into())
        }
        fn end(&mut self) -> HwResult<u8> {
            Ok(0)
        }
    }
    let log = Log::new(TestClock::new());
    let mut t = LineTracker::builder()
        .with_sensor(DeadSensor)
        .with_motor(common::SpyMotor(log))
        .build()
        .unwrap();
    let err = t.on_tick().expect_err("start fails on first tick");
    assert!(err.to_string().contains("starting acquisition"));
    assert!(matches!(
        err.downcast_ref::<TrackerError>(),
        Some(TrackerError::Hardware(_))
    ));
}
