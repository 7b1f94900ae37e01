//! Raspberry Pi GPIO operator panel and RGB status LED.
//!
//! Buttons are read with internal pull-ups. The LED is driven from a
//! background thread so blinking needs no help from the control loop; the
//! thread is stopped and joined when the `GpioLight` is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pacer_traits::{Buttons, Color, HwResult, Indicator, LightPattern, OperatorInput};
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::error::{HwError, Result};

const BLINK_HALF_PERIOD: Duration = Duration::from_millis(500);
const LIGHT_POLL: Duration = Duration::from_millis(20);

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn input(gpio: &Gpio, pin: u8) -> Result<InputPin> {
    Ok(gpio.get(pin).map_err(gpio_err)?.into_input_pullup())
}

fn output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    Ok(gpio.get(pin).map_err(gpio_err)?.into_output_low())
}

/// Three push buttons: rate up, rate down, pause.
pub struct GpioPanel {
    increase: InputPin,
    decrease: InputPin,
    pause: InputPin,
    active_low: bool,
}

impl GpioPanel {
    pub fn new(increase: u8, decrease: u8, pause: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let panel = Self {
            increase: input(&gpio, increase)?,
            decrease: input(&gpio, decrease)?,
            pause: input(&gpio, pause)?,
            active_low,
        };
        tracing::info!(increase, decrease, pause, active_low, "gpio panel ready");
        Ok(panel)
    }

    #[inline]
    fn pressed(&self, pin: &InputPin) -> bool {
        if self.active_low {
            pin.is_low()
        } else {
            pin.is_high()
        }
    }
}

impl OperatorInput for GpioPanel {
    fn poll(&mut self) -> HwResult<Buttons> {
        Ok(Buttons {
            increase: self.pressed(&self.increase),
            decrease: self.pressed(&self.decrease),
            pause: self.pressed(&self.pause),
        })
    }
}

struct RgbPins {
    red: OutputPin,
    green: OutputPin,
    blue: OutputPin,
}

impl RgbPins {
    fn show(&mut self, color: Option<Color>) {
        let (r, g, b) = match color {
            Some(Color::Red) => (true, false, false),
            Some(Color::Green) => (false, true, false),
            Some(Color::Blue) => (false, false, true),
            None => (false, false, false),
        };
        set(&mut self.red, r);
        set(&mut self.green, g);
        set(&mut self.blue, b);
    }
}

#[inline]
fn set(pin: &mut OutputPin, on: bool) {
    if on {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

/// RGB LED; the text payload is logged since there is no display attached.
pub struct GpioLight {
    pattern: Arc<Mutex<LightPattern>>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl GpioLight {
    pub fn new(red: u8, green: u8, blue: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut pins = RgbPins {
            red: output(&gpio, red)?,
            green: output(&gpio, green)?,
            blue: output(&gpio, blue)?,
        };
        let pattern = Arc::new(Mutex::new(LightPattern::Off));
        let shutdown = Arc::new(AtomicBool::new(false));
        let pattern_t = pattern.clone();
        let shutdown_t = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let mut phase_on = true;
            let mut since_toggle = Duration::ZERO;
            while !shutdown_t.load(Ordering::Relaxed) {
                let current = pattern_t.lock().map(|p| *p).unwrap_or(LightPattern::Off);
                match current {
                    LightPattern::Off => pins.show(None),
                    LightPattern::Steady(c) => pins.show(Some(c)),
                    LightPattern::Blink(c) => {
                        if since_toggle >= BLINK_HALF_PERIOD {
                            phase_on = !phase_on;
                            since_toggle = Duration::ZERO;
                        }
                        pins.show(phase_on.then_some(c));
                    }
                }
                std::thread::sleep(LIGHT_POLL);
                since_toggle += LIGHT_POLL;
            }
            pins.show(None);
            tracing::debug!("gpio light thread exiting");
        });

        Ok(Self {
            pattern,
            shutdown,
            join_handle: Some(join_handle),
        })
    }
}

impl Indicator for GpioLight {
    fn light(&mut self, pattern: LightPattern) -> HwResult<()> {
        let mut slot = self
            .pattern
            .lock()
            .map_err(|_| HwError::Gpio("light state poisoned".into()))?;
        *slot = pattern;
        Ok(())
    }

    fn text(&mut self, text: &str) -> HwResult<()> {
        tracing::info!(text, "display");
        Ok(())
    }
}

impl Drop for GpioLight {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("gpio light thread panicked");
        }
    }
}
