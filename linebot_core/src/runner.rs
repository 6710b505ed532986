//! Event loop tying tick sources and bump sources to a `LineTracker`.
//!
//! Interrupt-style callbacks only push into bounded channels; all control
//! work happens on the caller's thread. A pending bump always wins over a
//! pending tick, so no motor command can follow a collision.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use eyre::WrapErr;
use linebot_traits::{BumpSource, TickSource};

use crate::builder::LineTracker;
use crate::error::{Result, TrackerError};
use crate::fsm::FsmState;
use crate::hw_error::report;
use crate::status::TickStatus;

/// Poll interval for stop/max-run checks when no events arrive.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Optional ways for a run to end without a collision.
#[derive(Debug, Clone, Default)]
pub struct RunLimits {
    pub max_run: Option<Duration>,
    /// Cooperative stop flag (e.g. set from a Ctrl-C handler).
    pub stop: Option<Arc<AtomicBool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A bump fired and the disengagement sequence ran.
    Halted { bump_mask: u8 },
    /// Stop flag or max-run reached; motors stopped.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: Outcome,
    pub ticks: u64,
    pub control_periods: u64,
    pub acquisitions: u64,
    /// Ticks or control periods dropped because the loop was still busy
    /// with control work. Pulses during the collision sequence don't count.
    pub overruns: u64,
    pub final_state: FsmState,
    pub elapsed: Duration,
}

/// Scheduler pulses are discarded once `halting` is set; the collision
/// sequence owns the loop from then on.
fn pulse_sink(
    tx: xch::Sender<()>,
    overruns: Arc<AtomicU64>,
    halting: Arc<AtomicBool>,
) -> Box<dyn FnMut() + Send> {
    Box::new(move || {
        if halting.load(Ordering::Acquire) {
            return;
        }
        if let Err(xch::TrySendError::Full(())) = tx.try_send(()) {
            overruns.fetch_add(1, Ordering::Relaxed);
        }
    })
}

#[derive(Default)]
struct Counters {
    ticks: u64,
    control_periods: u64,
    acquisitions: u64,
}

/// Drive `tracker` from `ticker` and `bumps` until a collision, the stop
/// flag, or the max-run cap. Initialises the tracker first.
pub fn run<T, K>(
    tracker: &mut LineTracker,
    ticker: &mut T,
    bumps: &mut K,
    limits: RunLimits,
) -> Result<RunReport>
where
    T: TickSource + ?Sized,
    K: BumpSource + ?Sized,
{
    tracker.init()?;

    let overruns = Arc::new(AtomicU64::new(0));
    let halting = Arc::new(AtomicBool::new(false));
    let (tick_tx, tick_rx) = xch::bounded::<()>(1);
    let (ctrl_tx, ctrl_rx) = xch::bounded::<()>(1);
    let (bump_tx, bump_rx) = xch::bounded::<u8>(8);

    let schedule = *tracker.schedule_cfg();
    ticker
        .subscribe(
            schedule.tick_period(),
            pulse_sink(tick_tx, overruns.clone(), halting.clone()),
        )
        .map_err(report)
        .wrap_err("subscribing scheduler tick")?;
    ticker
        .subscribe(
            schedule.control_period(),
            pulse_sink(ctrl_tx, overruns.clone(), halting.clone()),
        )
        .map_err(report)
        .wrap_err("subscribing control period")?;
    bumps
        .subscribe(Box::new(move |mask| {
            let _ = bump_tx.try_send(mask);
        }))
        .map_err(report)
        .wrap_err("subscribing bump source")?;

    tracing::info!(
        tick_hz = schedule.tick_hz,
        control_hz = schedule.control_hz,
        acquisition_every = schedule.acquisition_every,
        "line tracking started"
    );

    let started = Instant::now();
    let mut counters = Counters::default();
    let result = event_loop(
        tracker,
        &tick_rx,
        &ctrl_rx,
        bump_rx,
        &halting,
        &limits,
        started,
        &mut counters,
    );

    let outcome = match result {
        Ok(o) => o,
        Err(e) => {
            if let Err(stop_err) = tracker.motor_stop() {
                tracing::warn!(error = %stop_err, "motor_stop failed after loop error");
            }
            return Err(e);
        }
    };

    let report = RunReport {
        outcome,
        ticks: counters.ticks,
        control_periods: counters.control_periods,
        acquisitions: counters.acquisitions,
        overruns: overruns.load(Ordering::Relaxed),
        final_state: tracker.state(),
        elapsed: started.elapsed(),
    };
    if report.overruns > 0 {
        tracing::warn!(overruns = report.overruns, "scheduler overran");
    }
    tracing::info!(outcome = ?report.outcome, ticks = report.ticks, "line tracking finished");
    Ok(report)
}

fn halt(tracker: &mut LineTracker, halting: &AtomicBool, mask: u8) -> Outcome {
    halting.store(true, Ordering::Release);
    tracker.handle_collision(mask);
    Outcome::Halted { bump_mask: mask }
}

fn event_loop(
    tracker: &mut LineTracker,
    tick_rx: &xch::Receiver<()>,
    ctrl_rx: &xch::Receiver<()>,
    mut bump_rx: xch::Receiver<u8>,
    halting: &AtomicBool,
    limits: &RunLimits,
    started: Instant,
    counters: &mut Counters,
) -> Result<Outcome> {
    loop {
        // Collisions preempt everything else.
        loop {
            match bump_rx.try_recv() {
                Ok(0) => continue,
                Ok(mask) => return Ok(halt(tracker, halting, mask)),
                Err(xch::TryRecvError::Empty) => break,
                Err(xch::TryRecvError::Disconnected) => {
                    tracing::debug!("bump source closed");
                    bump_rx = xch::never();
                    break;
                }
            }
        }

        let stop_requested = limits
            .stop
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed));
        let over_time = limits.max_run.is_some_and(|m| started.elapsed() >= m);
        if stop_requested || over_time {
            tracing::info!(stop_requested, over_time, "stopping line tracking");
            tracker.motor_stop()?;
            return Ok(Outcome::Stopped);
        }

        let mut bumps_closed = false;
        xch::select! {
            recv(bump_rx) -> msg => match msg {
                Ok(0) => {}
                Ok(mask) => return Ok(halt(tracker, halting, mask)),
                Err(_) => bumps_closed = true,
            },
            recv(tick_rx) -> msg => {
                msg.map_err(|_| eyre::Report::new(TrackerError::State(
                    "tick source disconnected".into(),
                )))?;
                if bump_rx.is_empty() {
                    counters.ticks += 1;
                    if let TickStatus::Updated(_) = tracker.on_tick()? {
                        counters.acquisitions += 1;
                    }
                }
            },
            recv(ctrl_rx) -> msg => {
                msg.map_err(|_| eyre::Report::new(TrackerError::State(
                    "control source disconnected".into(),
                )))?;
                if bump_rx.is_empty() {
                    counters.control_periods += 1;
                    tracker.on_control_period()?;
                }
            },
            default(IDLE_POLL) => {}
        }
        if bumps_closed {
            tracing::debug!("bump source closed");
            bump_rx = xch::never();
        }
    }
}
