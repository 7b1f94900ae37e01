//! Anti-blocking supervisor.
//!
//! Every check interval the shaft angle is sampled. If it moved less than
//! the threshold while a forward speed is commanded, the wheel is stopped,
//! turned back `reverse_deg` at `unblock_speed` and restarted at the
//! commanded speed. The reverse move blocks the control loop for at most
//! `worst_case_duration()`.
//!
//! Suspended while paused and while the injector holds the wheel in JAM.

use std::time::Duration;

use eyre::WrapErr;
use pacer_traits::{Actuator, Clock, Indicator};

use crate::config::AntiBlockCfg;
use crate::error::Result;
use crate::hw_error::hw_report;
use crate::state::{ControllerState, Mode};
use crate::status;
use crate::util::millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCheck {
    NotDue,
    Suspended,
    Moving { delta: u64 },
    Unblocked { delta: u64, maneuver: Duration },
}

#[derive(Debug, Clone, Copy)]
pub struct AntiBlockSupervisor {
    cfg: AntiBlockCfg,
}

impl AntiBlockSupervisor {
    pub fn new(cfg: AntiBlockCfg) -> Self {
        Self { cfg }
    }

    /// Upper bound on how long one reverse maneuver stalls the loop.
    pub fn worst_case_duration(&self) -> Duration {
        self.cfg.worst_case_unblock()
    }

    #[inline]
    fn suspended(state: &ControllerState) -> bool {
        state.paused || state.mode == Mode::Jam
    }

    pub fn check<A: Actuator + ?Sized>(
        &self,
        state: &mut ControllerState,
        actuator: &mut A,
        indicator: &mut dyn Indicator,
        clock: &dyn Clock,
    ) -> Result<BlockCheck> {
        if Self::suspended(state) {
            return Ok(BlockCheck::Suspended);
        }
        if state.timers.block.elapsed(clock) < self.cfg.check_interval {
            return Ok(BlockCheck::NotDue);
        }

        let position = actuator.angle().map_err(hw_report).wrap_err("actuator angle")?;
        let delta = position.abs_diff(state.last_actuator_position);

        let outcome = if delta < u64::from(self.cfg.threshold_deg) && state.commanded_speed > 0.0 {
            tracing::warn!(
                delta,
                threshold = self.cfg.threshold_deg,
                speed = state.commanded_speed,
                "actuator seems blocked; reversing"
            );
            status::signal(indicator, &mut state.last_light, status::UNBLOCKING);
            let started = clock.now();
            actuator.stop().map_err(hw_report).wrap_err("actuator stop")?;
            actuator
                .run_angle(self.cfg.unblock_speed, self.cfg.reverse_deg)
                .map_err(hw_report)
                .wrap_err("unblock maneuver")?;
            actuator
                .run(state.commanded_speed)
                .map_err(hw_report)
                .wrap_err("resume after unblock")?;
            let maneuver = clock.now().saturating_duration_since(started);
            status::signal(indicator, &mut state.last_light, status::UNBLOCKED);
            state.unblocks = state.unblocks.saturating_add(1);
            tracing::info!(
                maneuver_ms = millis(maneuver),
                unblocks = state.unblocks,
                "unblock maneuver finished"
            );
            BlockCheck::Unblocked { delta, maneuver }
        } else {
            tracing::trace!(delta, "actuator moving");
            BlockCheck::Moving { delta }
        };

        state.last_actuator_position = position;
        state.timers.block.reset(clock);
        Ok(outcome)
    }

    /// Take a fresh baseline and restart the interval, e.g. after a pause.
    pub fn rearm<A: Actuator + ?Sized>(
        &self,
        state: &mut ControllerState,
        actuator: &mut A,
        clock: &dyn Clock,
    ) -> Result<()> {
        state.last_actuator_position =
            actuator.angle().map_err(hw_report).wrap_err("actuator angle")?;
        state.timers.block.reset(clock);
        Ok(())
    }
}
