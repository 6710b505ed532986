use std::time::{Duration, Instant};

use linebot_traits::Color;

/// Pack per-channel levels into a sensor bitmap; `levels[i]` becomes bit `i`.
pub fn pack_levels<I>(levels: I) -> u8
where
    I: IntoIterator<Item = bool>,
{
    levels
        .into_iter()
        .take(8)
        .enumerate()
        .fold(0u8, |acc, (i, high)| if high { acc | (1 << i) } else { acc })
}

/// Red, green and blue channel states for an RGB LED.
pub const fn rgb(color: Color) -> [bool; 3] {
    match color {
        Color::Off => [false, false, false],
        Color::Red => [true, false, false],
        Color::Green => [false, true, false],
        Color::Yellow => [true, true, false],
        Color::Blue => [false, false, true],
        Color::SkyBlue => [false, true, true],
    }
}

/// Drops events closer than `window` to the last accepted one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub const fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns `true` if an event at `now` should be delivered.
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last {
            Some(prev) if now.saturating_duration_since(prev) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
