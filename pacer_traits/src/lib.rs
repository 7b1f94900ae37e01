pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing every hardware trait boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Reflectance-style sensor looking at the ball chute.
pub trait ReflectanceSensor {
    /// Raw reading; higher means more light reflected back (a ball is present).
    fn reflection(&mut self) -> HwResult<i32>;
}

/// Feed motor driving the release wheel. Speeds are degrees per second.
pub trait Actuator {
    /// Run continuously at `speed` (negative reverses).
    fn run(&mut self, speed: f64) -> HwResult<()>;
    fn stop(&mut self) -> HwResult<()>;
    /// Turn by `degrees` at `speed` and return once the move has finished.
    fn run_angle(&mut self, speed: f64, degrees: u32) -> HwResult<()>;
    /// Cumulative shaft angle in degrees.
    fn angle(&mut self) -> HwResult<i64>;
}

/// Button levels as sampled this tick. `true` means held down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Buttons {
    pub increase: bool,
    pub decrease: bool,
    pub pause: bool,
}

/// Operator panel with rate up/down and a pause toggle.
pub trait OperatorInput {
    fn poll(&mut self) -> HwResult<Buttons>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Blue,
}

/// Status light state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightPattern {
    Off,
    Steady(Color),
    /// 500 ms on / 500 ms off.
    Blink(Color),
}

/// Status light plus a short text display. Fire-and-forget.
pub trait Indicator {
    fn light(&mut self, pattern: LightPattern) -> HwResult<()>;
    fn text(&mut self, text: &str) -> HwResult<()>;
}

impl<T: ReflectanceSensor + ?Sized> ReflectanceSensor for Box<T> {
    fn reflection(&mut self) -> HwResult<i32> {
        (**self).reflection()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn run(&mut self, speed: f64) -> HwResult<()> {
        (**self).run(speed)
    }
    fn stop(&mut self) -> HwResult<()> {
        (**self).stop()
    }
    fn run_angle(&mut self, speed: f64, degrees: u32) -> HwResult<()> {
        (**self).run_angle(speed, degrees)
    }
    fn angle(&mut self) -> HwResult<i64> {
        (**self).angle()
    }
}

impl<T: OperatorInput + ?Sized> OperatorInput for Box<T> {
    fn poll(&mut self) -> HwResult<Buttons> {
        (**self).poll()
    }
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn light(&mut self, pattern: LightPattern) -> HwResult<()> {
        (**self).light(pattern)
    }
    fn text(&mut self, text: &str) -> HwResult<()> {
        (**self).text(text)
    }
}
