//! Stand-in peripherals for builds without LEDs, buzzer or bumpers.

use std::time::Duration;

use linebot_traits::{BumpSource, Buzzer, Color, HwResult, Indicator, Led};

/// Accepts every LED update and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl Indicator for NullIndicator {
    fn set(&mut self, _led: Led, _color: Color) -> HwResult<()> {
        Ok(())
    }
}

/// Skips tones without waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBuzzer;

impl Buzzer for SilentBuzzer {
    fn play_tone(&mut self, _frequency_hz: u32, _duration: Duration) -> HwResult<()> {
        Ok(())
    }
}

/// Bump source that never fires. The sink is dropped immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBumps;

impl BumpSource for NoBumps {
    fn subscribe(&mut self, _sink: Box<dyn FnMut(u8) + Send>) -> HwResult<()> {
        Ok(())
    }
}
