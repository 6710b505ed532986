//! Disengagement choreography run once on a bump.
//!
//! Everything here is best-effort: a failing peripheral is logged and the
//! sequence carries on, since there is nobody left to report to.

use std::time::Duration;

use linebot_traits::clock::Clock;
use linebot_traits::{Buzzer, Color, Indicator, Led, Motor};

use crate::config::CollisionCfg;

/// Musical pitches used by the tune, stored as square-wave half-periods (µs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pitch {
    C4,
    D4,
    E4,
    F4,
    F4Sharp,
    G4,
    A4,
    B4,
    C5,
}

impl Pitch {
    pub const fn half_period_us(self) -> u32 {
        match self {
            Self::C4 => 1980,
            Self::D4 => 1750,
            Self::E4 => 1555,
            Self::F4 => 1470,
            Self::F4Sharp => 1390,
            Self::G4 => 1310,
            Self::A4 => 1165,
            Self::B4 => 1040,
            Self::C5 => 980,
        }
    }

    pub const fn frequency_hz(self) -> u32 {
        1_000_000 / (2 * self.half_period_us())
    }

    /// Length of `cycles` full periods.
    pub fn duration(self, cycles: u32) -> Duration {
        Duration::from_micros(2 * u64::from(self.half_period_us()) * u64::from(cycles))
    }
}

/// Silence between notes.
pub const NOTE_GAP: Duration = Duration::from_micros(200);

/// The closing tune as `(pitch, cycles)`.
pub const TUNE: [(Pitch, u32); 30] = {
    use Pitch::*;
    [
        (D4, 200),
        (G4, 200),
        (G4, 100),
        (A4, 100),
        (G4, 100),
        (F4Sharp, 100),
        (E4, 200),
        (E4, 200),
        (E4, 200),
        (A4, 200),
        (A4, 100),
        (B4, 100),
        (A4, 100),
        (G4, 100),
        (F4Sharp, 200),
        (D4, 200),
        (D4, 200),
        (B4, 200),
        (B4, 100),
        (C5, 100),
        (B4, 100),
        (A4, 100),
        (G4, 200),
        (E4, 200),
        (D4, 100),
        (D4, 100),
        (E4, 200),
        (A4, 200),
        (F4Sharp, 200),
        (G4, 200),
    ]
};

/// Peripheral writes that failed during the choreography.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisengageReport {
    pub failures: u32,
}

struct Steps<'a, M, I, B> {
    motor: &'a mut M,
    indicator: &'a mut I,
    buzzer: &'a mut B,
    clock: &'a dyn Clock,
    report: DisengageReport,
}

impl<M: Motor, I: Indicator, B: Buzzer> Steps<'_, M, I, B> {
    fn check(&mut self, what: &'static str, r: linebot_traits::HwResult<()>) {
        if let Err(e) = r {
            self.report.failures += 1;
            tracing::warn!(error = %e, step = what, "disengage step failed");
        }
    }

    fn stop(&mut self) {
        let r = self.motor.stop();
        self.check("stop", r);
    }

    fn leds(&mut self, color: Color) {
        let r = self.indicator.set(Led::Primary, color);
        self.check("led primary", r);
        let r = self.indicator.set(Led::Secondary, color);
        self.check("led secondary", r);
    }

    fn wait(&self, d: Duration) {
        self.clock.sleep(d);
    }
}

/// Run the full sequence: stop, flash, back off, turn away, play the tune.
///
/// The motors are stopped at the end and never restarted from here.
pub fn disengage<M: Motor, I: Indicator, B: Buzzer>(
    motor: &mut M,
    indicator: &mut I,
    buzzer: &mut B,
    clock: &dyn Clock,
    cfg: &CollisionCfg,
) -> DisengageReport {
    let mut s = Steps {
        motor,
        indicator,
        buzzer,
        clock,
        report: DisengageReport::default(),
    };

    s.stop();
    s.wait(cfg.stop_hold);

    for _ in 0..cfg.flash_count {
        s.leds(Color::Off);
        s.wait(cfg.flash_interval);
        s.leds(Color::Red);
        s.wait(cfg.flash_interval);
    }

    let r = s.motor.backward(cfg.reverse_duty, cfg.reverse_duty);
    s.check("backward", r);
    s.wait(cfg.reverse_for);
    s.stop();
    s.wait(cfg.settle_for);

    let r = s.motor.right(cfg.pivot_duty, cfg.pivot_duty);
    s.check("pivot right", r);
    s.wait(cfg.pivot_for);
    s.stop();

    if cfg.play_tune {
        tracing::debug!(notes = TUNE.len(), "playing tune");
        for (pitch, cycles) in TUNE {
            let r = s.buzzer.play_tone(pitch.frequency_hz(), pitch.duration(cycles));
            s.check("tone", r);
            s.wait(NOTE_GAP);
        }
    }

    s.report
}
