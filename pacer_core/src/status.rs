//! Rate status classification and the indicator vocabulary.
//!
//! Pure mapping from the 60 s rate and the current bounds to a light
//! pattern, plus the text payloads shown on the display.

use pacer_traits::{Color, Indicator, LightPattern};

use crate::bounds::DerivedBounds;

/// Light shown while a reverse maneuver runs.
pub const UNBLOCKING: LightPattern = LightPattern::Blink(Color::Red);
/// Light shown after a reverse maneuver until the next status update.
pub const UNBLOCKED: LightPattern = LightPattern::Blink(Color::Blue);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateStatus {
    BelowSevere,
    Below,
    OnTarget,
    Above,
    AboveSevere,
}

impl RateStatus {
    /// Classify a rate against the band.
    ///
    /// Both severe thresholds sit at twice the respective bound. Any rate under
    /// the band is also under `2 * lower`, so it reports `BelowSevere`.
    pub fn classify(rate: f64, bounds: &DerivedBounds) -> Self {
        if rate > bounds.upper {
            if rate > 2.0 * bounds.upper {
                Self::AboveSevere
            } else {
                Self::Above
            }
        } else if rate < bounds.lower {
            if rate < 2.0 * bounds.lower {
                Self::BelowSevere
            } else {
                Self::Below
            }
        } else {
            Self::OnTarget
        }
    }

    pub const fn light(self) -> LightPattern {
        match self {
            Self::AboveSevere => LightPattern::Blink(Color::Red),
            Self::Above => LightPattern::Steady(Color::Red),
            Self::OnTarget => LightPattern::Steady(Color::Green),
            Self::Below => LightPattern::Steady(Color::Blue),
            Self::BelowSevere => LightPattern::Blink(Color::Blue),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BelowSevere => "below_severe",
            Self::Below => "below",
            Self::OnTarget => "on_target",
            Self::Above => "above",
            Self::AboveSevere => "above_severe",
        }
    }
}

/// Status for the last completed 60 s window, if there is one yet.
pub fn report(window60_rate: Option<f64>, bounds: &DerivedBounds) -> Option<RateStatus> {
    window60_rate.map(|r| RateStatus::classify(r, bounds))
}

/// Send `pattern` unless it is already showing. Indicator errors are logged.
pub fn show(indicator: &mut dyn Indicator, last: &mut Option<LightPattern>, pattern: LightPattern) {
    if *last == Some(pattern) {
        return;
    }
    signal(indicator, last, pattern);
}

/// Send `pattern` unconditionally. Indicator errors are logged.
pub fn signal(indicator: &mut dyn Indicator, last: &mut Option<LightPattern>, pattern: LightPattern) {
    match indicator.light(pattern) {
        Ok(()) => *last = Some(pattern),
        Err(e) => tracing::warn!(error = %e, ?pattern, "indicator light failed"),
    }
}

/// Show `text` on the display. Indicator errors are logged.
pub fn display(indicator: &mut dyn Indicator, text: &str) {
    if let Err(e) = indicator.text(text) {
        tracing::warn!(error = %e, text, "indicator text failed");
    }
}

pub fn target_text(target: f64) -> String {
    format!("{target:.2}")
}

pub fn paused_text(total_rate: f64, total_events: u64) -> String {
    format!("R:{total_rate:.3}B:{total_events}")
}

pub fn resumed_text(target: f64) -> String {
    format!("T:{target:.2}")
}
