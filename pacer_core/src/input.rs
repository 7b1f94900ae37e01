//! Edge detection for the operator buttons.

use pacer_traits::Buttons;

/// Turns sampled button levels into one-shot presses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ButtonEdges {
    prev: Buttons,
}

impl ButtonEdges {
    /// Buttons that went from released to held since the previous sample.
    pub fn rising(&mut self, now: Buttons) -> Buttons {
        let pressed = Buttons {
            increase: now.increase && !self.prev.increase,
            decrease: now.decrease && !self.prev.decrease,
            pause: now.pause && !self.prev.pause,
        };
        self.prev = now;
        pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_button_fires_once() {
        let mut edges = ButtonEdges::default();
        let held = Buttons {
            pause: true,
            ..Buttons::default()
        };
        assert!(edges.rising(held).pause);
        assert!(!edges.rising(held).pause);
        assert!(!edges.rising(Buttons::default()).pause);
        assert!(edges.rising(held).pause);
    }
}
