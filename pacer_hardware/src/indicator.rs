use pacer_traits::{HwResult, Indicator, LightPattern};

/// Indicator that reports light and display changes through `tracing`.
///
/// Repeated identical states are not logged again.
#[derive(Debug, Default)]
pub struct LogIndicator {
    light: Option<LightPattern>,
    text: String,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_light(&self) -> Option<LightPattern> {
        self.light
    }

    pub fn current_text(&self) -> &str {
        &self.text
    }
}

impl Indicator for LogIndicator {
    fn light(&mut self, pattern: LightPattern) -> HwResult<()> {
        if self.light != Some(pattern) {
            tracing::info!(light = ?pattern, "status light");
            self.light = Some(pattern);
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> HwResult<()> {
        if self.text != text {
            tracing::info!(text, "display");
            self.text.clear();
            self.text.push_str(text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_traits::Color;

    #[test]
    fn remembers_last_state() {
        let mut ind = LogIndicator::new();
        ind.light(LightPattern::Steady(Color::Green)).unwrap();
        ind.text("0.95").unwrap();
        assert_eq!(ind.current_light(), Some(LightPattern::Steady(Color::Green)));
        assert_eq!(ind.current_text(), "0.95");
    }
}
