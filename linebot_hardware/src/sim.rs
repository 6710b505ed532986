//! Simulated peripherals.
//!
//! Each simulated device records what it was asked to do into shared state
//! that a cloned probe handle can inspect after (or during) a run.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use linebot_config::{Track, TrackRow};
use linebot_traits::clock::Clock;
use linebot_traits::{BumpSource, Buzzer, Color, HwResult, Indicator, Led, LineSensor, Motor};

use crate::error::HwError;
use crate::pwm::{Channel, PwmTimer};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Default number of entries a recorder keeps before dropping the oldest.
pub const DEFAULT_HISTORY: usize = 1024;

/// Push onto a recorder holding at most `cap` entries. `cap == 0` records nothing.
fn record<T>(log: &mut VecDeque<T>, cap: usize, item: T) {
    if cap == 0 {
        return;
    }
    while log.len() >= cap {
        log.pop_front();
    }
    log.push_back(item);
}

// ── Motor ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCommand {
    Forward { left: u16, right: u16 },
    Backward { left: u16, right: u16 },
    Left { left: u16, right: u16 },
    Right { left: u16, right: u16 },
    Stop,
}

#[derive(Debug, Default)]
struct MotorState {
    timer: PwmTimer,
    commands: VecDeque<MotorCommand>,
    history: usize,
    last: Option<MotorCommand>,
    enabled: bool,
    initialised: bool,
}

/// Differential drive over a simulated PWM timer. Keeps the most recent
/// `DEFAULT_HISTORY` commands unless told otherwise.
#[derive(Debug, Clone)]
pub struct SimMotor {
    state: Arc<Mutex<MotorState>>,
}

/// Read-only view of a `SimMotor`.
#[derive(Debug, Clone)]
pub struct MotorProbe {
    state: Arc<Mutex<MotorState>>,
}

impl SimMotor {
    pub fn new(pwm_period: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(MotorState {
                timer: PwmTimer::new(pwm_period),
                history: DEFAULT_HISTORY,
                ..MotorState::default()
            })),
        }
    }

    /// Keep at most `n` commands; `0` disables recording.
    pub fn with_history(self, n: usize) -> Self {
        lock(&self.state).history = n;
        self
    }

    pub fn probe(&self) -> MotorProbe {
        MotorProbe {
            state: self.state.clone(),
        }
    }

    fn drive(&mut self, cmd: MotorCommand, left: u16, right: u16) -> HwResult<()> {
        let mut st = lock(&self.state);
        if !st.initialised {
            return Err(Box::new(HwError::Pwm("motor used before init".into())));
        }
        st.timer.update(Channel::Right, right);
        st.timer.update(Channel::Left, left);
        st.enabled = true;
        st.last = Some(cmd);
        let cap = st.history;
        record(&mut st.commands, cap, cmd);
        tracing::trace!(?cmd, "sim motor");
        Ok(())
    }
}

impl Default for SimMotor {
    fn default() -> Self {
        Self::new(PwmTimer::DEFAULT_PERIOD)
    }
}

impl Motor for SimMotor {
    fn init(&mut self) -> HwResult<()> {
        let mut st = lock(&self.state);
        let period = st.timer.period();
        st.timer = PwmTimer::new(period);
        st.enabled = false;
        st.initialised = true;
        tracing::debug!(period, "sim motor initialised");
        Ok(())
    }
    fn forward(&mut self, left: u16, right: u16) -> HwResult<()> {
        self.drive(MotorCommand::Forward { left, right }, left, right)
    }
    fn backward(&mut self, left: u16, right: u16) -> HwResult<()> {
        self.drive(MotorCommand::Backward { left, right }, left, right)
    }
    fn left(&mut self, left: u16, right: u16) -> HwResult<()> {
        self.drive(MotorCommand::Left { left, right }, left, right)
    }
    fn right(&mut self, left: u16, right: u16) -> HwResult<()> {
        self.drive(MotorCommand::Right { left, right }, left, right)
    }
    fn stop(&mut self) -> HwResult<()> {
        let mut st = lock(&self.state);
        st.enabled = false;
        st.timer.update(Channel::Right, 0);
        st.timer.update(Channel::Left, 0);
        st.last = Some(MotorCommand::Stop);
        let cap = st.history;
        record(&mut st.commands, cap, MotorCommand::Stop);
        tracing::trace!("sim motor stop");
        Ok(())
    }
}

impl MotorProbe {
    /// Recorded commands, oldest first.
    pub fn commands(&self) -> Vec<MotorCommand> {
        lock(&self.state).commands.iter().copied().collect()
    }

    /// Most recent command, recorded or not.
    pub fn last(&self) -> Option<MotorCommand> {
        lock(&self.state).last
    }

    /// Current compare values as `(left, right)`.
    pub fn duties(&self) -> (u16, u16) {
        let st = lock(&self.state);
        (st.timer.duty(Channel::Left), st.timer.duty(Channel::Right))
    }

    /// Whether the drivers are awake (any command since the last stop).
    pub fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }
}

// ── Line sensor ──────────────────────────────────────────────────────────────

/// Replays a `Track`: each row's bitmap is returned for `cycles` reads, and
/// the last bitmap is held once the script runs out.
#[derive(Debug)]
pub struct ScriptedLineSensor {
    rows: Vec<TrackRow>,
    row: usize,
    left_in_row: u32,
    charged: bool,
    reads: u64,
}

impl ScriptedLineSensor {
    pub fn new(track: Track) -> Self {
        let left_in_row = track.rows.first().map_or(0, |r| r.cycles);
        Self {
            rows: track.rows,
            row: 0,
            left_in_row,
            charged: false,
            reads: 0,
        }
    }

    /// Number of completed acquisitions.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn next_bitmap(&mut self) -> u8 {
        let Some(current) = self.rows.get(self.row) else {
            return 0;
        };
        let bitmap = current.bitmap;
        if self.row + 1 < self.rows.len() {
            self.left_in_row = self.left_in_row.saturating_sub(1);
            if self.left_in_row == 0 {
                self.row += 1;
                self.left_in_row = self.rows[self.row].cycles;
                tracing::trace!(row = self.row, "track script advanced");
            }
        }
        bitmap
    }
}

impl LineSensor for ScriptedLineSensor {
    fn init(&mut self) -> HwResult<()> {
        self.charged = false;
        tracing::debug!(rows = self.rows.len(), "scripted line sensor ready");
        Ok(())
    }

    fn start(&mut self) -> HwResult<()> {
        self.charged = true;
        Ok(())
    }

    fn end(&mut self) -> HwResult<u8> {
        if !self.charged {
            return Err(Box::new(HwError::Script(
                "acquisition ended without start".into(),
            )));
        }
        self.charged = false;
        self.reads += 1;
        Ok(self.next_bitmap())
    }

    fn read(&mut self, _wait: Duration) -> HwResult<u8> {
        self.start()?;
        self.end()
    }
}

// ── Indicator ────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct IndicatorState {
    primary: Option<Color>,
    secondary: Option<Color>,
    history: VecDeque<(Led, Color)>,
    cap: usize,
}

impl Default for IndicatorState {
    fn default() -> Self {
        Self {
            primary: None,
            secondary: None,
            history: VecDeque::new(),
            cap: DEFAULT_HISTORY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimIndicator {
    state: Arc<Mutex<IndicatorState>>,
}

#[derive(Debug, Clone)]
pub struct IndicatorProbe {
    state: Arc<Mutex<IndicatorState>>,
}

impl SimIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `n` LED writes; `0` disables recording.
    pub fn with_history(self, n: usize) -> Self {
        lock(&self.state).cap = n;
        self
    }

    pub fn probe(&self) -> IndicatorProbe {
        IndicatorProbe {
            state: self.state.clone(),
        }
    }
}

impl Indicator for SimIndicator {
    fn set(&mut self, led: Led, color: Color) -> HwResult<()> {
        let mut st = lock(&self.state);
        let slot = match led {
            Led::Primary => &mut st.primary,
            Led::Secondary => &mut st.secondary,
        };
        if *slot != Some(color) {
            tracing::debug!(?led, ?color, "led");
        }
        *slot = Some(color);
        let cap = st.cap;
        record(&mut st.history, cap, (led, color));
        Ok(())
    }
}

impl IndicatorProbe {
    /// Last color written to `led`, if any.
    pub fn current(&self, led: Led) -> Option<Color> {
        let st = lock(&self.state);
        match led {
            Led::Primary => st.primary,
            Led::Secondary => st.secondary,
        }
    }

    /// Recorded LED writes, oldest first.
    pub fn history(&self) -> Vec<(Led, Color)> {
        lock(&self.state).history.iter().copied().collect()
    }
}

// ── Buzzer ───────────────────────────────────────────────────────────────────

/// Records tones. With a clock attached, each tone also blocks on that clock
/// for its duration.
#[derive(Clone, Default)]
pub struct SimBuzzer {
    tones: Arc<Mutex<Vec<(u32, Duration)>>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

#[derive(Debug, Clone)]
pub struct ToneProbe {
    tones: Arc<Mutex<Vec<(u32, Duration)>>>,
}

impl std::fmt::Debug for SimBuzzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBuzzer")
            .field("tones", &lock(&self.tones).len())
            .field("blocking", &self.clock.is_some())
            .finish()
    }
}

impl SimBuzzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn probe(&self) -> ToneProbe {
        ToneProbe {
            tones: self.tones.clone(),
        }
    }
}

impl Buzzer for SimBuzzer {
    fn play_tone(&mut self, frequency_hz: u32, duration: Duration) -> HwResult<()> {
        tracing::trace!(frequency_hz, ?duration, "tone");
        lock(&self.tones).push((frequency_hz, duration));
        if let Some(clock) = &self.clock {
            clock.sleep(duration);
        }
        Ok(())
    }
}

impl ToneProbe {
    pub fn tones(&self) -> Vec<(u32, Duration)> {
        lock(&self.tones).clone()
    }

    pub fn total_duration(&self) -> Duration {
        lock(&self.tones).iter().map(|(_, d)| *d).sum()
    }
}

// ── Bumpers ──────────────────────────────────────────────────────────────────

/// Fires one bump with `mask` after `after`, from a helper thread.
///
/// The thread checks for shutdown every few milliseconds, so dropping the
/// source before the bump is due cancels it and joins quickly.
#[derive(Debug)]
pub struct ScriptedBumps {
    after: Duration,
    mask: u8,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

const BUMP_POLL: Duration = Duration::from_millis(5);

impl ScriptedBumps {
    pub fn new(after: Duration, mask: u8) -> Self {
        Self {
            after,
            mask,
            shutdown: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl BumpSource for ScriptedBumps {
    fn subscribe(&mut self, mut sink: Box<dyn FnMut(u8) + Send>) -> HwResult<()> {
        if self.handle.is_some() {
            return Err(Box::new(HwError::Script(
                "bump source already subscribed".into(),
            )));
        }
        let (after, mask) = (self.after, self.mask);
        let shutdown = self.shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("bump-script".into())
            .spawn(move || {
                let deadline = std::time::Instant::now() + after;
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        break;
                    }
                    std::thread::sleep((deadline - now).min(BUMP_POLL));
                }
                tracing::debug!(mask, "scripted bump");
                sink(mask);
            })?;
        self.handle = Some(handle);
        Ok(())
    }
}

impl Drop for ScriptedBumps {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take()
            && let Err(e) = h.join()
        {
            tracing::warn!(?e, "bump script thread panicked");
        }
    }
}
