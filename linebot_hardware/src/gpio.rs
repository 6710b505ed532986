//! rppal-backed drivers for the physical robot.
//!
//! Pin numbers come from the `[pins]` config section (BCM numbering).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use linebot_config::Pins;
use linebot_traits::{BumpSource, Buzzer, Color, HwResult, Indicator, Led, LineSensor, Motor};
use rppal::gpio::{Gpio, InputPin, IoPin, Mode, OutputPin, Trigger};

use crate::error::{HwError, Result};
use crate::pwm::{Channel, PwmTimer};
use crate::util::{Debouncer, pack_levels, rgb};

/// How long the sensor outputs are driven high before being released.
const CHARGE_TIME: Duration = Duration::from_micros(10);

fn output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    Ok(gpio.get(pin)?.into_output_low())
}

// ── Line sensor ──────────────────────────────────────────────────────────────

pub struct GpioLineSensor {
    channels: Vec<IoPin>,
    emitter_even: OutputPin,
    emitter_odd: OutputPin,
}

impl GpioLineSensor {
    pub fn new(gpio: &Gpio, pins: &Pins) -> Result<Self> {
        if pins.sensor.len() != 8 {
            return Err(HwError::Gpio(format!(
                "line sensor needs 8 pins, got {}",
                pins.sensor.len()
            )));
        }
        let channels = pins
            .sensor
            .iter()
            .map(|&p| Ok(gpio.get(p)?.into_io(Mode::Input)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            channels,
            emitter_even: output(gpio, pins.emitter_even)?,
            emitter_odd: output(gpio, pins.emitter_odd)?,
        })
    }
}

impl LineSensor for GpioLineSensor {
    fn start(&mut self) -> HwResult<()> {
        self.emitter_even.set_high();
        self.emitter_odd.set_high();
        for ch in &mut self.channels {
            ch.set_mode(Mode::Output);
            ch.set_high();
        }
        std::thread::sleep(CHARGE_TIME);
        for ch in &mut self.channels {
            ch.set_mode(Mode::Input);
        }
        Ok(())
    }

    fn end(&mut self) -> HwResult<u8> {
        let bitmap = pack_levels(self.channels.iter().map(IoPin::is_high));
        self.emitter_even.set_low();
        self.emitter_odd.set_low();
        Ok(bitmap)
    }
}

// ── Motor ────────────────────────────────────────────────────────────────────

pub struct GpioMotor {
    left_dir: OutputPin,
    right_dir: OutputPin,
    left_pwm: OutputPin,
    right_pwm: OutputPin,
    sleep: Option<OutputPin>,
    timer: PwmTimer,
    pwm_hz: f64,
}

impl GpioMotor {
    pub fn new(gpio: &Gpio, pins: &Pins, pwm_period: u16, pwm_hz: f64) -> Result<Self> {
        let sleep = pins.motor_sleep.map(|p| output(gpio, p)).transpose()?;
        Ok(Self {
            left_dir: output(gpio, pins.left_dir)?,
            right_dir: output(gpio, pins.right_dir)?,
            left_pwm: output(gpio, pins.left_pwm)?,
            right_pwm: output(gpio, pins.right_pwm)?,
            sleep,
            timer: PwmTimer::new(pwm_period),
            pwm_hz,
        })
    }

    fn apply_pwm(&mut self) -> Result<()> {
        self.right_pwm
            .set_pwm_frequency(self.pwm_hz, self.timer.fraction(Channel::Right))
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        self.left_pwm
            .set_pwm_frequency(self.pwm_hz, self.timer.fraction(Channel::Left))
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(())
    }

    /// `true` in a direction slot means that wheel runs backward.
    fn drive(&mut self, left_back: bool, right_back: bool, left: u16, right: u16) -> Result<()> {
        self.left_dir.write(left_back.into());
        self.right_dir.write(right_back.into());
        self.timer.update(Channel::Right, right);
        self.timer.update(Channel::Left, left);
        self.apply_pwm()?;
        if let Some(pin) = &mut self.sleep {
            pin.set_high();
        }
        Ok(())
    }
}

impl Motor for GpioMotor {
    fn init(&mut self) -> HwResult<()> {
        self.timer = PwmTimer::new(self.timer.period());
        self.apply_pwm()?;
        tracing::debug!(pwm_hz = self.pwm_hz, period = self.timer.period(), "gpio motor ready");
        Ok(())
    }
    fn forward(&mut self, left: u16, right: u16) -> HwResult<()> {
        Ok(self.drive(false, false, left, right)?)
    }
    fn backward(&mut self, left: u16, right: u16) -> HwResult<()> {
        Ok(self.drive(true, true, left, right)?)
    }
    fn left(&mut self, left: u16, right: u16) -> HwResult<()> {
        Ok(self.drive(true, false, left, right)?)
    }
    fn right(&mut self, left: u16, right: u16) -> HwResult<()> {
        Ok(self.drive(false, true, left, right)?)
    }
    fn stop(&mut self) -> HwResult<()> {
        if let Some(pin) = &mut self.sleep {
            pin.set_low();
        }
        self.left_dir.set_low();
        self.right_dir.set_low();
        self.timer.update(Channel::Right, 0);
        self.timer.update(Channel::Left, 0);
        self.right_pwm
            .clear_pwm()
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        self.left_pwm
            .clear_pwm()
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(())
    }
}

// ── Indicator ────────────────────────────────────────────────────────────────

/// One or three pins per LED: a single pin is a plain on/off LED, three pins
/// are the red, green and blue legs of an RGB LED.
pub struct GpioIndicator {
    primary: Vec<OutputPin>,
    secondary: Vec<OutputPin>,
}

impl GpioIndicator {
    pub fn new(gpio: &Gpio, pins: &Pins) -> Result<Self> {
        let open = |list: &[u8]| {
            list.iter()
                .map(|&p| output(gpio, p))
                .collect::<Result<Vec<_>>>()
        };
        Ok(Self {
            primary: open(&pins.led_primary)?,
            secondary: open(&pins.led_secondary)?,
        })
    }
}

fn show(pins: &mut [OutputPin], color: Color) {
    match pins {
        [single] => single.write((color != Color::Off).into()),
        [r, g, b] => {
            let [rv, gv, bv] = rgb(color);
            r.write(rv.into());
            g.write(gv.into());
            b.write(bv.into());
        }
        _ => {}
    }
}

impl Indicator for GpioIndicator {
    fn set(&mut self, led: Led, color: Color) -> HwResult<()> {
        match led {
            Led::Primary => show(&mut self.primary, color),
            Led::Secondary => show(&mut self.secondary, color),
        }
        Ok(())
    }
}

// ── Buzzer ───────────────────────────────────────────────────────────────────

/// Square wave on a plain output pin, timed by sleeping half periods.
pub struct GpioBuzzer {
    pin: OutputPin,
}

impl GpioBuzzer {
    pub fn new(gpio: &Gpio, pin: u8) -> Result<Self> {
        Ok(Self {
            pin: output(gpio, pin)?,
        })
    }
}

impl Buzzer for GpioBuzzer {
    fn play_tone(&mut self, frequency_hz: u32, duration: Duration) -> HwResult<()> {
        if frequency_hz == 0 {
            std::thread::sleep(duration);
            return Ok(());
        }
        let half = Duration::from_micros(500_000 / u64::from(frequency_hz));
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.pin.toggle();
            std::thread::sleep(half);
        }
        self.pin.set_low();
        Ok(())
    }
}

// ── Bumpers ──────────────────────────────────────────────────────────────────

/// Active-low bump switches with pull-ups. Switch `i` reports bit `i`.
pub struct GpioBumpers {
    pins: Vec<InputPin>,
    debounce: Duration,
}

impl GpioBumpers {
    pub fn new(gpio: &Gpio, pins: &Pins, debounce: Duration) -> Result<Self> {
        let pins = pins
            .bumpers
            .iter()
            .map(|&p| Ok(gpio.get(p)?.into_input_pullup()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pins, debounce })
    }
}

impl BumpSource for GpioBumpers {
    fn subscribe(&mut self, sink: Box<dyn FnMut(u8) + Send>) -> HwResult<()> {
        let sink = Arc::new(Mutex::new(sink));
        let debouncer = Arc::new(Mutex::new(Debouncer::new(self.debounce)));
        for (i, pin) in self.pins.iter_mut().enumerate() {
            let mask = 1u8 << i;
            let sink = sink.clone();
            let debouncer = debouncer.clone();
            // Debounced across all switches below, not per pin.
            pin.set_async_interrupt(Trigger::FallingEdge, None, move |_event| {
                let accepted = debouncer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .accept(Instant::now());
                if accepted {
                    (sink.lock().unwrap_or_else(PoisonError::into_inner))(mask);
                }
            })
            .map_err(HwError::from)?;
        }
        tracing::debug!(switches = self.pins.len(), "bumpers armed");
        Ok(())
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────────

/// Every GPIO peripheral the robot has, opened from one config.
pub struct GpioRig {
    pub sensor: GpioLineSensor,
    pub motor: GpioMotor,
    pub indicator: GpioIndicator,
    /// `None` when `pins.buzzer` is not set.
    pub buzzer: Option<GpioBuzzer>,
    pub bumpers: GpioBumpers,
}

impl GpioRig {
    pub fn open(cfg: &linebot_config::Config) -> Result<Self> {
        let gpio = Gpio::new()?;
        let pins = &cfg.pins;
        let buzzer = pins
            .buzzer
            .map(|p| GpioBuzzer::new(&gpio, p))
            .transpose()?;
        let rig = Self {
            sensor: GpioLineSensor::new(&gpio, pins)?,
            motor: GpioMotor::new(&gpio, pins, cfg.drive.pwm_period, cfg.hardware.pwm_hz)?,
            indicator: GpioIndicator::new(&gpio, pins)?,
            buzzer,
            bumpers: GpioBumpers::new(
                &gpio,
                pins,
                Duration::from_millis(cfg.hardware.bump_debounce_ms),
            )?,
        };
        tracing::info!("gpio peripherals opened");
        Ok(rig)
    }
}
