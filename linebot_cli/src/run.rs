//! Peripheral assembly and command execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use linebot_config::{Config, Track, load_track_csv};
use linebot_core::runner::{Outcome, RunLimits, RunReport};
use linebot_core::ticker::ThreadTicker;
use linebot_core::{FsmState, LineTracker, Offset, SensorBitmap, TrackerCfg};
use linebot_traits::BumpSource;
use linebot_traits::clock::MonotonicClock;

use crate::error_fmt::config_error;

/// Overrides taken from `linebot run` flags; `None` falls back to `[run]`.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub track: Option<PathBuf>,
    pub max_run_ms: Option<u64>,
    pub bump_after_ms: Option<u64>,
    pub bump_mask: Option<u8>,
}

/// Planned simulated bump.
#[derive(Debug, Clone, Copy)]
struct BumpPlan {
    after: Duration,
    mask: u8,
}

struct Rig {
    tracker: LineTracker,
    bumps: Box<dyn BumpSource>,
}

fn load_track(cfg: &Config, cli_track: Option<&Path>) -> eyre::Result<Track> {
    let path = cli_track
        .map(Path::to_path_buf)
        .or_else(|| cfg.run.track.as_ref().map(PathBuf::from));
    match path {
        Some(p) => {
            let track = load_track_csv(&p).map_err(|e| config_error(format!("{e:#}")))?;
            tracing::info!(path = %p.display(), rows = track.rows.len(), "track script loaded");
            Ok(track)
        }
        None => Ok(Track::builtin()),
    }
}

#[cfg(not(feature = "hardware"))]
fn assemble(cfg: &Config, track: Track, bump: Option<BumpPlan>) -> eyre::Result<Rig> {
    use linebot_core::mocks::NoBumps;
    use linebot_hardware::{ScriptedBumps, ScriptedLineSensor, SimBuzzer, SimIndicator, SimMotor};

    let tracker = LineTracker::builder()
        .with_sensor(ScriptedLineSensor::new(track))
        .with_motor(SimMotor::new(cfg.drive.pwm_period).with_history(0))
        .with_indicator(SimIndicator::new().with_history(0))
        .with_buzzer(SimBuzzer::new().with_clock(Arc::new(MonotonicClock::new())))
        .with_cfg(TrackerCfg::from(cfg))
        .build()
        .wrap_err("building simulated tracker")?;
    let bumps: Box<dyn BumpSource> = match bump {
        Some(plan) => Box::new(ScriptedBumps::new(plan.after, plan.mask)),
        None => Box::new(NoBumps),
    };
    Ok(Rig { tracker, bumps })
}

#[cfg(feature = "hardware")]
fn assemble(cfg: &Config, _track: Track, bump: Option<BumpPlan>) -> eyre::Result<Rig> {
    use linebot_core::mocks::SilentBuzzer;
    use linebot_hardware::gpio::GpioRig;
    use linebot_traits::Buzzer;

    if bump.is_some() {
        tracing::warn!("simulated bump ignored on GPIO hardware");
    }
    let rig = GpioRig::open(cfg).wrap_err("opening GPIO peripherals")?;
    let buzzer: Box<dyn Buzzer> = match rig.buzzer {
        Some(b) => Box::new(b),
        None => Box::new(SilentBuzzer),
    };
    let tracker = LineTracker::builder()
        .with_sensor(rig.sensor)
        .with_motor(rig.motor)
        .with_indicator(rig.indicator)
        .with_buzzer(buzzer)
        .with_cfg(TrackerCfg::from(cfg))
        .build()
        .wrap_err("building GPIO tracker")?;
    Ok(Rig {
        tracker,
        bumps: Box::new(rig.bumpers),
    })
}

/// `linebot run`: follow the line until a bump, the stop flag, or the cap.
pub fn run_line(cfg: &Config, args: RunArgs, shutdown: Arc<AtomicBool>) -> eyre::Result<RunReport> {
    let track = load_track(cfg, args.track.as_deref())?;
    let max_run_ms = args.max_run_ms.unwrap_or(cfg.run.max_run_ms);
    let mask = args.bump_mask.unwrap_or(cfg.run.bump_mask);
    let bump = match args.bump_after_ms.or(cfg.run.bump_after_ms) {
        Some(_) if mask == 0 => return Err(config_error("bump mask must be non-zero")),
        Some(ms) => Some(BumpPlan {
            after: Duration::from_millis(ms),
            mask,
        }),
        None => None,
    };

    let mut rig = assemble(cfg, track, bump)?;
    let mut ticker = ThreadTicker::new(MonotonicClock::new());
    let limits = RunLimits {
        max_run: (max_run_ms > 0).then(|| Duration::from_millis(max_run_ms)),
        stop: Some(shutdown),
    };
    linebot_core::runner::run(&mut rig.tracker, &mut ticker, &mut *rig.bumps, limits)
}

/// Result of `linebot self-check`.
#[derive(Debug, Clone, Copy)]
pub struct CheckReport {
    pub bitmap: SensorBitmap,
    pub offset: Offset,
    pub state: FsmState,
}

/// `linebot self-check`: build the tracker, take one reading, stop the motors.
pub fn self_check(cfg: &Config) -> eyre::Result<CheckReport> {
    let track = load_track(cfg, None)?;
    let mut rig = assemble(cfg, track, None)?;
    rig.tracker.init()?;
    let wait = Duration::from_micros(cfg.schedule.sensor_wait_us);
    let (bitmap, offset) = rig.tracker.probe(wait)?;
    rig.tracker.motor_stop()?;
    tracing::info!(bitmap = %bitmap, offset, "self-check reading");
    Ok(CheckReport {
        bitmap,
        offset,
        state: rig.tracker.state(),
    })
}

pub fn render_report(r: &RunReport, json: bool) -> String {
    let elapsed_ms = u64::try_from(r.elapsed.as_millis()).unwrap_or(u64::MAX);
    if json {
        let (outcome, mask) = match r.outcome {
            Outcome::Halted { bump_mask } => ("halted", Some(bump_mask)),
            Outcome::Stopped => ("stopped", None),
        };
        return serde_json::json!({
            "outcome": outcome,
            "bump_mask": mask,
            "ticks": r.ticks,
            "acquisitions": r.acquisitions,
            "control_periods": r.control_periods,
            "overruns": r.overruns,
            "final_state": r.final_state.name(),
            "elapsed_ms": elapsed_ms,
        })
        .to_string();
    }
    let head = match r.outcome {
        Outcome::Halted { bump_mask } => format!("halted on bump (mask {bump_mask:#04x})"),
        Outcome::Stopped => "stopped".to_string(),
    };
    format!(
        "{head} after {elapsed_ms} ms: {} ticks, {} acquisitions, {} control periods, {} overruns, final state {}",
        r.ticks, r.acquisitions, r.control_periods, r.overruns, r.final_state
    )
}

pub fn render_check(c: &CheckReport, json: bool) -> String {
    if json {
        return serde_json::json!({
            "ok": true,
            "bitmap": c.bitmap.to_string(),
            "offset": c.offset,
            "state": c.state.name(),
        })
        .to_string();
    }
    format!(
        "self-check ok: bitmap {} offset {} state {}",
        c.bitmap, c.offset, c.state
    )
}
