//! Test and helper mocks for pacer_core.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pacer_traits::{Buttons, HwResult, Indicator, LightPattern, OperatorInput};

use crate::injector::RandomSource;

/// A panel with no buttons ever pressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPanel;

impl OperatorInput for NoopPanel {
    fn poll(&mut self) -> HwResult<Buttons> {
        Ok(Buttons::default())
    }
}

/// An indicator that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl Indicator for NullIndicator {
    fn light(&mut self, _pattern: LightPattern) -> HwResult<()> {
        Ok(())
    }

    fn text(&mut self, _text: &str) -> HwResult<()> {
        Ok(())
    }
}

/// Button levels replayed one per poll; released once the script runs out.
/// Clones share the script, so a test can keep a handle after moving one
/// into the controller.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPanel {
    script: Arc<Mutex<VecDeque<Buttons>>>,
}

impl ScriptedPanel {
    pub fn push(&self, levels: Buttons) {
        if let Ok(mut q) = self.script.lock() {
            q.push_back(levels);
        }
    }

    /// Queue a press followed by a release.
    pub fn tap(&self, levels: Buttons) {
        self.push(levels);
        self.push(Buttons::default());
    }
}

impl OperatorInput for ScriptedPanel {
    fn poll(&mut self) -> HwResult<Buttons> {
        let next = self
            .script
            .lock()
            .map_err(|_| std::io::Error::other("panel script poisoned"))?
            .pop_front();
        Ok(next.unwrap_or_default())
    }
}

/// Records everything sent to it. Clones share the log.
#[derive(Debug, Default, Clone)]
pub struct RecordingIndicator {
    lights: Arc<Mutex<Vec<LightPattern>>>,
    texts: Arc<Mutex<Vec<String>>>,
}

impl RecordingIndicator {
    pub fn lights(&self) -> Vec<LightPattern> {
        self.lights.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Indicator for RecordingIndicator {
    fn light(&mut self, pattern: LightPattern) -> HwResult<()> {
        self.lights
            .lock()
            .map_err(|_| std::io::Error::other("indicator log poisoned"))?
            .push(pattern);
        Ok(())
    }

    fn text(&mut self, text: &str) -> HwResult<()> {
        self.texts
            .lock()
            .map_err(|_| std::io::Error::other("indicator log poisoned"))?
            .push(text.to_owned());
        Ok(())
    }
}

/// Deterministic `RandomSource` cycling through fixed sequences.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    picks: Vec<usize>,
    durations: Vec<u64>,
    next_pick: usize,
    next_duration: usize,
}

impl ScriptedRandom {
    pub fn new(
        picks: impl IntoIterator<Item = usize>,
        durations_ms: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            picks: picks.into_iter().collect(),
            durations: durations_ms.into_iter().collect(),
            next_pick: 0,
            next_duration: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn pick(&mut self, len: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let v = self.picks[self.next_pick % self.picks.len()];
        self.next_pick = self.next_pick.wrapping_add(1);
        v % len.max(1)
    }

    fn between_ms(&mut self, lo: u64, hi: u64) -> u64 {
        if self.durations.is_empty() {
            return lo;
        }
        let v = self.durations[self.next_duration % self.durations.len()];
        self.next_duration = self.next_duration.wrapping_add(1);
        v.clamp(lo, hi.max(lo))
    }
}
