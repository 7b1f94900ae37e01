//! Operator panel on stdin for simulated runs.
//!
//! A reader thread turns key characters into presses. Each press is reported
//! as one pressed poll followed by one released poll, so the controller sees
//! a clean rising edge per key.

use std::io::BufRead;

use crossbeam_channel as xch;
use pacer_traits::{Buttons, HwResult, OperatorInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Increase,
    Decrease,
    Pause,
}

fn parse_keys(line: &str) -> impl Iterator<Item = Key> + '_ {
    line.chars().filter_map(|c| match c {
        '+' | 'u' => Some(Key::Increase),
        '-' | 'd' => Some(Key::Decrease),
        'p' | ' ' => Some(Key::Pause),
        _ => None,
    })
}

#[derive(Debug)]
pub struct StdinPanel {
    rx: xch::Receiver<Key>,
    holding: bool,
}

impl StdinPanel {
    /// Spawn the reader thread. It exits at end of input.
    pub fn spawn() -> Self {
        let (tx, rx) = xch::bounded(16);
        let spawned = std::thread::Builder::new()
            .name("stdin-panel".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    for key in parse_keys(&line) {
                        if tx.send(key).is_err() {
                            return;
                        }
                    }
                }
                tracing::debug!("stdin panel closed");
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "stdin panel thread not started");
        }
        Self { rx, holding: false }
    }

    #[cfg(test)]
    fn from_channel(rx: xch::Receiver<Key>) -> Self {
        Self { rx, holding: false }
    }
}

impl OperatorInput for StdinPanel {
    fn poll(&mut self) -> HwResult<Buttons> {
        if self.holding {
            self.holding = false;
            return Ok(Buttons::default());
        }
        let Ok(key) = self.rx.try_recv() else {
            return Ok(Buttons::default());
        };
        self.holding = true;
        Ok(Buttons {
            increase: key == Key::Increase,
            decrease: key == Key::Decrease,
            pause: key == Key::Pause,
        })
    }
}
