#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and track-script parsing for the line follower.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; defaults are the firmware tuning.
//! - Track scripts are CSV files replayed by the simulated line sensor.
use serde::Deserialize;
use serde::de::Deserializer;

/// GPIO numbers (BCM) for the `hardware` backend. Ignored in simulation.
#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Pins {
    /// Reflectance outputs, index 0 = rightmost sensor. Exactly eight.
    pub sensor: Vec<u8>,
    /// Emitter enables for the even and odd sensor banks.
    pub emitter_even: u8,
    pub emitter_odd: u8,
    pub left_dir: u8,
    pub right_dir: u8,
    pub left_pwm: u8,
    pub right_pwm: u8,
    /// Driver sleep/enable line, held high while running.
    pub motor_sleep: Option<u8>,
    /// One pin (single-colour LED) or three pins (R, G, B).
    pub led_primary: Vec<u8>,
    pub led_secondary: Vec<u8>,
    pub buzzer: Option<u8>,
    /// Bumper switches, active low; bit i of the mask is `bumpers[i]`.
    pub bumpers: Vec<u8>,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            sensor: vec![4, 17, 27, 22, 5, 6, 13, 19],
            emitter_even: 20,
            emitter_odd: 21,
            left_dir: 23,
            right_dir: 24,
            left_pwm: 12,
            right_pwm: 18,
            motor_sleep: Some(25),
            led_primary: vec![26],
            led_secondary: vec![16, 7, 8],
            buzzer: Some(11),
            bumpers: vec![9, 10, 14, 15, 2, 3],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct PidCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Desired offset in 0.1 mm; 0 keeps the line centred.
    pub desired: f64,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            kp: 20.0,
            ki: 0.0,
            kd: 1.0,
            desired: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct DriveCfg {
    pub nominal: u16,
    pub swing: u16,
    /// PWM timer period in counts; duties must stay below it.
    pub pwm_period: u16,
}

impl Default for DriveCfg {
    fn default() -> Self {
        Self {
            nominal: 3500,
            swing: 3000,
            pwm_period: 15000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleCfg {
    pub tick_hz: u32,
    /// Ticks per acquisition cycle (>= 3).
    pub acquisition_every: u32,
    pub control_hz: u32,
    /// Decay wait for one-shot reads (self-check).
    pub sensor_wait_us: u64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            tick_hz: 1000,
            acquisition_every: 10,
            control_hz: 1000,
            sensor_wait_us: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatternCheck {
    #[default]
    FourBit,
    LowBitOnly,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreLeftScope {
    #[default]
    PositionAndPatterns,
    PatternsOnly,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct FsmCfg {
    pub pattern_check: PatternCheck,
    pub ignore_left_scope: IgnoreLeftScope,
    pub center_band: i32,
    pub recovery_limit: i32,
}

impl Default for FsmCfg {
    fn default() -> Self {
        Self {
            pattern_check: PatternCheck::FourBit,
            ignore_left_scope: IgnoreLeftScope::PositionAndPatterns,
            center_band: 48,
            recovery_limit: 238,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct CollisionCfg {
    pub stop_hold_ms: u64,
    pub flash_count: u32,
    pub flash_interval_ms: u64,
    pub reverse_duty: u16,
    pub reverse_ms: u64,
    pub settle_ms: u64,
    pub pivot_duty: u16,
    pub pivot_ms: u64,
    pub play_tune: bool,
}

impl Default for CollisionCfg {
    fn default() -> Self {
        Self {
            stop_hold_ms: 1000,
            flash_count: 5,
            flash_interval_ms: 200,
            reverse_duty: 4500,
            reverse_ms: 500,
            settle_ms: 500,
            pivot_duty: 4500,
            pivot_ms: 1300,
            play_tune: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct Hardware {
    /// Software PWM carrier for the GPIO motor backend.
    pub pwm_hz: f64,
    /// Debounce for bumper edges.
    pub bump_debounce_ms: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            pwm_hz: 800.0,
            bump_debounce_ms: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct RunCfg {
    /// Stop after this long; 0 runs until a collision or Ctrl-C.
    pub max_run_ms: u64,
    /// Track script for the simulated sensor; built-in track when absent.
    pub track: Option<String>,
    /// Simulated bump: fire `bump_mask` after this many ms.
    pub bump_after_ms: Option<u64>,
    #[serde(default = "default_bump_mask", deserialize_with = "de_bitmap")]
    pub bump_mask: u8,
}

const fn default_bump_mask() -> u8 {
    0x01
}

impl Default for RunCfg {
    fn default() -> Self {
        Self {
            max_run_ms: 0,
            track: None,
            bump_after_ms: None,
            bump_mask: default_bump_mask(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub pid: PidCfg,
    #[serde(default)]
    pub drive: DriveCfg,
    #[serde(default)]
    pub schedule: ScheduleCfg,
    #[serde(default)]
    pub fsm: FsmCfg,
    #[serde(default)]
    pub collision: CollisionCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub run: RunCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Parse a sensor bitmap written as `0x..`, `0b..` or decimal.
pub fn parse_bitmap(s: &str) -> eyre::Result<u8> {
    let t = s.trim();
    let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else if let Some(bin) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        u8::from_str_radix(&bin.replace('_', ""), 2)
    } else {
        t.parse::<u8>()
    };
    parsed.map_err(|e| eyre::eyre!("invalid bitmap {t:?}: {e}"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BitmapToml {
    Int(u8),
    Text(String),
}

fn de_bitmap<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    match BitmapToml::deserialize(deserializer)? {
        BitmapToml::Int(v) => Ok(v),
        BitmapToml::Text(s) => parse_bitmap(&s).map_err(serde::de::Error::custom),
    }
}

/// One segment of a track script: hold `bitmap` for `cycles` acquisitions.
///
/// Expected headers:
/// cycles,bitmap
///
/// Example:
/// cycles,bitmap
/// 40,0x18
/// 5,0b00001111
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TrackRow {
    pub cycles: u32,
    #[serde(deserialize_with = "de_bitmap")]
    pub bitmap: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub rows: Vec<TrackRow>,
}

impl Track {
    pub fn from_rows(rows: Vec<TrackRow>) -> eyre::Result<Self> {
        if rows.is_empty() {
            eyre::bail!("track script has no rows");
        }
        if let Some(i) = rows.iter().position(|r| r.cycles == 0) {
            eyre::bail!("track row {} has cycles = 0", i + 2);
        }
        Ok(Self { rows })
    }

    /// Built-in course: straight, drift both ways, a sharp right, a gap, then
    /// back on the line.
    pub fn builtin() -> Self {
        let rows = [
            (60, 0x18),
            (20, 0x0C),
            (20, 0x06),
            (20, 0x18),
            (20, 0x30),
            (20, 0x60),
            (20, 0x18),
            (10, 0x1F),
            (20, 0x03),
            (20, 0x0C),
            (40, 0x18),
            (15, 0x00),
            (20, 0x08),
            (60, 0x18),
        ]
        .into_iter()
        .map(|(cycles, bitmap)| TrackRow { cycles, bitmap })
        .collect();
        Self { rows }
    }

    /// Total acquisitions covered by the script.
    pub fn total_cycles(&self) -> u64 {
        self.rows.iter().map(|r| u64::from(r.cycles)).sum()
    }
}

impl TryFrom<Vec<TrackRow>> for Track {
    type Error = eyre::Report;
    fn try_from(rows: Vec<TrackRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_track_csv(path: &std::path::Path) -> eyre::Result<Track> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open track CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["cycles", "bitmap"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "track CSV must have headers 'cycles,bitmap', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TrackRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    Track::try_from(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // PID
        for (name, v) in [
            ("kp", self.pid.kp),
            ("ki", self.pid.ki),
            ("kd", self.pid.kd),
            ("desired", self.pid.desired),
        ] {
            if !v.is_finite() {
                eyre::bail!("pid.{name} must be finite");
            }
        }

        // Drive
        let d = &self.drive;
        if d.nominal == 0 {
            eyre::bail!("drive.nominal must be > 0");
        }
        if d.swing > d.nominal {
            eyre::bail!("drive.swing must be <= drive.nominal");
        }
        if u32::from(d.nominal) + u32::from(d.swing) >= u32::from(d.pwm_period) {
            eyre::bail!("drive.nominal + drive.swing must be < drive.pwm_period");
        }

        // Schedule
        if self.schedule.tick_hz == 0 {
            eyre::bail!("schedule.tick_hz must be > 0");
        }
        if self.schedule.control_hz == 0 {
            eyre::bail!("schedule.control_hz must be > 0");
        }
        if self.schedule.tick_hz > 100_000 || self.schedule.control_hz > 100_000 {
            eyre::bail!("schedule rates above 100 kHz are not supported");
        }
        if self.schedule.acquisition_every < 3 {
            eyre::bail!("schedule.acquisition_every must be >= 3");
        }

        // FSM
        if self.fsm.center_band <= 0 {
            eyre::bail!("fsm.center_band must be > 0");
        }
        if self.fsm.recovery_limit <= self.fsm.center_band {
            eyre::bail!("fsm.recovery_limit must be > fsm.center_band");
        }

        // Collision
        let c = &self.collision;
        if c.reverse_duty >= d.pwm_period || c.pivot_duty >= d.pwm_period {
            eyre::bail!("collision duties must be < drive.pwm_period");
        }
        if c.flash_count > 100 {
            eyre::bail!("collision.flash_count is unreasonably large (>100)");
        }

        // Hardware
        if !(self.hardware.pwm_hz.is_finite() && self.hardware.pwm_hz > 0.0) {
            eyre::bail!("hardware.pwm_hz must be > 0");
        }

        // Pins
        if self.pins.sensor.len() != 8 {
            eyre::bail!("pins.sensor must list exactly 8 pins");
        }
        for (name, leds) in [
            ("led_primary", &self.pins.led_primary),
            ("led_secondary", &self.pins.led_secondary),
        ] {
            if !matches!(leds.len(), 0 | 1 | 3) {
                eyre::bail!("pins.{name} must list 0, 1 or 3 pins");
            }
        }
        if self.pins.bumpers.len() > 8 {
            eyre::bail!("pins.bumpers supports at most 8 switches");
        }

        // Run
        if self.run.bump_after_ms.is_some() && self.run.bump_mask == 0 {
            eyre::bail!("run.bump_mask must be non-zero when run.bump_after_ms is set");
        }

        Ok(())
    }
}
