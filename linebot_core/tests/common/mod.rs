#![allow(dead_code)]
//! Recording peripherals shared by the integration tests.
//!
//! Every spy writes into one `Log`, stamped with the shared `TestClock`, so
//! tests can assert on the global order and timing of hardware calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use linebot_core::{FsmCfg, LineTracker, ScheduleCfg};
use linebot_traits::clock::Clock;
use linebot_traits::clock::test_clock::TestClock;
use linebot_traits::{Buzzer, Color, HwResult, Indicator, Led, LineSensor, Motor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SensorStart,
    SensorEnd(u8),
    Forward(u16, u16),
    Backward(u16, u16),
    Left(u16, u16),
    Right(u16, u16),
    Stop,
    Led(Led, Color),
    Tone(u32, Duration),
}

impl Event {
    pub fn is_motor(&self) -> bool {
        matches!(
            self,
            Self::Forward(..) | Self::Backward(..) | Self::Left(..) | Self::Right(..) | Self::Stop
        )
    }

    pub fn is_sensor(&self) -> bool {
        matches!(self, Self::SensorStart | Self::SensorEnd(_))
    }
}

#[derive(Clone)]
pub struct Log {
    clock: TestClock,
    entries: Arc<Mutex<Vec<(Duration, Event)>>>,
}

impl Log {
    pub fn new(clock: TestClock) -> Self {
        Self {
            clock,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, e: Event) {
        let at = self.clock.elapsed();
        self.entries.lock().unwrap().push((at, e));
    }

    pub fn events(&self) -> Vec<Event> {
        self.entries.lock().unwrap().iter().map(|(_, e)| *e).collect()
    }

    pub fn stamped(&self) -> Vec<(Duration, Event)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn clock(&self) -> &TestClock {
        &self.clock
    }
}

pub struct SpyMotor(pub Log);

impl Motor for SpyMotor {
    fn forward(&mut self, l: u16, r: u16) -> HwResult<()> {
        self.0.push(Event::Forward(l, r));
        Ok(())
    }
    fn backward(&mut self, l: u16, r: u16) -> HwResult<()> {
        self.0.push(Event::Backward(l, r));
        Ok(())
    }
    fn left(&mut self, l: u16, r: u16) -> HwResult<()> {
        self.0.push(Event::Left(l, r));
        Ok(())
    }
    fn right(&mut self, l: u16, r: u16) -> HwResult<()> {
        self.0.push(Event::Right(l, r));
        Ok(())
    }
    fn stop(&mut self) -> HwResult<()> {
        self.0.push(Event::Stop);
        Ok(())
    }
}

pub struct SpyIndicator(pub Log);

impl Indicator for SpyIndicator {
    fn set(&mut self, led: Led, color: Color) -> HwResult<()> {
        self.0.push(Event::Led(led, color));
        Ok(())
    }
}

/// Records the tone and advances the clock by its duration, as a real
/// blocking buzzer would.
pub struct SpyBuzzer(pub Log);

impl Buzzer for SpyBuzzer {
    fn play_tone(&mut self, frequency_hz: u32, duration: Duration) -> HwResult<()> {
        self.0.push(Event::Tone(frequency_hz, duration));
        self.0.clock().sleep(duration);
        Ok(())
    }
}

/// Returns queued bitmaps from `end()`, holding the last one once drained.
pub struct ScriptSensor {
    log: Log,
    queue: VecDeque<u8>,
    last: u8,
}

impl ScriptSensor {
    pub fn new(log: Log, bitmaps: &[u8]) -> Self {
        Self {
            log,
            queue: bitmaps.iter().copied().collect(),
            last: 0x18,
        }
    }
}

impl LineSensor for ScriptSensor {
    fn start(&mut self) -> HwResult<()> {
        self.log.push(Event::SensorStart);
        Ok(())
    }
    fn end(&mut self) -> HwResult<u8> {
        if let Some(b) = self.queue.pop_front() {
            self.last = b;
        }
        self.log.push(Event::SensorEnd(self.last));
        Ok(self.last)
    }
    fn read(&mut self, _wait: Duration) -> HwResult<u8> {
        self.start()?;
        self.end()
    }
}

/// A motor whose every call fails.
pub struct BrokenMotor;

impl Motor for BrokenMotor {
    fn forward(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Err("driver fault".into())
    }
    fn backward(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Err("driver fault".into())
    }
    fn left(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Err("driver fault".into())
    }
    fn right(&mut self, _l: u16, _r: u16) -> HwResult<()> {
        Err("driver fault".into())
    }
    fn stop(&mut self) -> HwResult<()> {
        Err("driver fault".into())
    }
}

/// Tracker wired to spies over one log and a fresh test clock.
pub fn spy_tracker(bitmaps: &[u8], fsm: FsmCfg) -> (LineTracker, Log) {
    let log = Log::new(TestClock::new());
    let tracker = LineTracker::builder()
        .with_sensor(ScriptSensor::new(log.clone(), bitmaps))
        .with_motor(SpyMotor(log.clone()))
        .with_indicator(SpyIndicator(log.clone()))
        .with_buzzer(SpyBuzzer(log.clone()))
        .with_fsm(fsm)
        .with_schedule(ScheduleCfg::default())
        .with_clock(Box::new(log.clock().clone()))
        .build()
        .unwrap();
    (tracker, log)
}

/// Run one full acquisition cycle of ten ticks.
pub fn acquisition_cycle(tracker: &mut LineTracker) {
    for _ in 0..10 {
        tracker.on_tick().unwrap();
    }
}

/// Bump source that fires once from a helper thread after `after`.
pub struct DelayedBump {
    pub after: Duration,
    pub mask: u8,
}

impl linebot_traits::BumpSource for DelayedBump {
    fn subscribe(&mut self, mut sink: Box<dyn FnMut(u8) + Send>) -> HwResult<()> {
        let (after, mask) = (self.after, self.mask);
        std::thread::spawn(move || {
            std::thread::sleep(after);
            sink(mask);
        });
        Ok(())
    }
}
