//! Contracts for the peripherals the line-follower core drives.
//!
//! Every trait here is bound once at start-up; the core never stores raw
//! callback pointers. Errors cross the boundary boxed so that any backend
//! (simulated, GPIO, test spy) can report its own error type.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Eight-channel reflectance array. Bit 0 is the rightmost sensor, 1 = line.
pub trait LineSensor {
    fn init(&mut self) -> HwResult<()> {
        Ok(())
    }
    /// Charge the sensor outputs and release them to decay.
    fn start(&mut self) -> HwResult<()>;
    /// Sample the decayed outputs and switch the emitters off.
    fn end(&mut self) -> HwResult<u8>;
    /// One-shot read: `start`, wait `wait`, then `end`.
    fn read(&mut self, wait: Duration) -> HwResult<u8> {
        self.start()?;
        std::thread::sleep(wait);
        self.end()
    }
}

/// Differential drive. Duty values are pre-clamped by the caller.
pub trait Motor {
    fn init(&mut self) -> HwResult<()> {
        Ok(())
    }
    fn forward(&mut self, left_duty: u16, right_duty: u16) -> HwResult<()>;
    fn backward(&mut self, left_duty: u16, right_duty: u16) -> HwResult<()>;
    /// Pivot left: left wheel backward, right wheel forward.
    fn left(&mut self, left_duty: u16, right_duty: u16) -> HwResult<()>;
    /// Pivot right: left wheel forward, right wheel backward.
    fn right(&mut self, left_duty: u16, right_duty: u16) -> HwResult<()>;
    fn stop(&mut self) -> HwResult<()>;
}

/// The two status LEDs on the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Off,
    Red,
    Green,
    Yellow,
    Blue,
    SkyBlue,
}

pub trait Indicator {
    fn set(&mut self, led: Led, color: Color) -> HwResult<()>;
}

/// Piezo buzzer. `play_tone` blocks for `duration`.
pub trait Buzzer {
    fn play_tone(&mut self, frequency_hz: u32, duration: Duration) -> HwResult<()>;
}

/// Periodic interrupt source. The sink must return quickly.
pub trait TickSource {
    fn subscribe(&mut self, period: Duration, sink: Box<dyn FnMut() + Send>) -> HwResult<()>;
}

/// Bumper switches. The sink receives a bitmask of the switches that fired.
pub trait BumpSource {
    fn subscribe(&mut self, sink: Box<dyn FnMut(u8) + Send>) -> HwResult<()>;
}

impl<T: LineSensor + ?Sized> LineSensor for Box<T> {
    fn init(&mut self) -> HwResult<()> {
        (**self).init()
    }
    fn start(&mut self) -> HwResult<()> {
        (**self).start()
    }
    fn end(&mut self) -> HwResult<u8> {
        (**self).end()
    }
    fn read(&mut self, wait: Duration) -> HwResult<u8> {
        (**self).read(wait)
    }
}

impl<T: Motor + ?Sized> Motor for Box<T> {
    fn init(&mut self) -> HwResult<()> {
        (**self).init()
    }
    fn forward(&mut self, l: u16, r: u16) -> HwResult<()> {
        (**self).forward(l, r)
    }
    fn backward(&mut self, l: u16, r: u16) -> HwResult<()> {
        (**self).backward(l, r)
    }
    fn left(&mut self, l: u16, r: u16) -> HwResult<()> {
        (**self).left(l, r)
    }
    fn right(&mut self, l: u16, r: u16) -> HwResult<()> {
        (**self).right(l, r)
    }
    fn stop(&mut self) -> HwResult<()> {
        (**self).stop()
    }
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn set(&mut self, led: Led, color: Color) -> HwResult<()> {
        (**self).set(led, color)
    }
}

impl<T: Buzzer + ?Sized> Buzzer for Box<T> {
    fn play_tone(&mut self, frequency_hz: u32, duration: Duration) -> HwResult<()> {
        (**self).play_tone(frequency_hz, duration)
    }
}
