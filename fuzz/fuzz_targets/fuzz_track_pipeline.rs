#![no_main]
use libfuzzer_sys::fuzz_target;
use linebot_core::mocks::{NullIndicator, SilentBuzzer};
use linebot_core::{SensorBitmap, TrackerCfg, build_tracker};
use linebot_traits::{HwResult, LineSensor, Motor};

struct NoSensor;

impl LineSensor for NoSensor {
    fn start(&mut self) -> HwResult<()> {
        Ok(())
    }
    fn end(&mut self) -> HwResult<u8> {
        Ok(0)
    }
}

struct NoMotor;

impl Motor for NoMotor {
    fn forward(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Ok(())
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

fuzz_target!(|bitmaps: Vec<u8>| {
    let cfg = TrackerCfg::default();
    let (lo, hi) = (cfg.drive.min(), cfg.drive.max());
    let Ok(mut t) = build_tracker(NoSensor, NoMotor, NullIndicator, SilentBuzzer, cfg, None) else {
        return;
    };
    for b in bitmaps {
        let obs = t.step_from_bitmap(SensorBitmap::new(b));
        assert!((lo..=hi).contains(&obs.duty.left));
        assert!((lo..=hi).contains(&obs.duty.right));
        t.on_control_period().ok();
    }
});
