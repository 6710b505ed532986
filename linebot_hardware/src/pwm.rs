//! Two-channel PWM timer model.
//!
//! Both motor backends keep their compare values here so the drop rule is
//! the same everywhere: an update with `duty >= period` is ignored and the
//! channel keeps its previous duty.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Compare channel 1, wired to the right wheel.
    Right,
    /// Compare channel 2, wired to the left wheel.
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmTimer {
    period: u16,
    right: u16,
    left: u16,
}

impl PwmTimer {
    pub const DEFAULT_PERIOD: u16 = 15_000;

    /// Timer with both channels at zero duty. With a zero period every
    /// update is dropped and both channels stay off.
    pub const fn new(period: u16) -> Self {
        Self {
            period,
            right: 0,
            left: 0,
        }
    }

    pub const fn period(&self) -> u16 {
        self.period
    }

    /// Set a channel's compare value. Returns `false` if the update was
    /// dropped for reaching the period.
    pub fn update(&mut self, channel: Channel, duty: u16) -> bool {
        if duty >= self.period {
            tracing::trace!(?channel, duty, period = self.period, "pwm update dropped");
            return false;
        }
        match channel {
            Channel::Right => self.right = duty,
            Channel::Left => self.left = duty,
        }
        true
    }

    pub const fn duty(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Right => self.right,
            Channel::Left => self.left,
        }
    }

    /// Duty as a fraction of the period, in `[0, 1)`. Zero for a zero period.
    pub fn fraction(&self, channel: Channel) -> f64 {
        if self.period == 0 {
            return 0.0;
        }
        f64::from(self.duty(channel)) / f64::from(self.period)
    }
}

impl Default for PwmTimer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD)
    }
}
