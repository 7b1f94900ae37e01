//! Simulated ball run: one release wheel, one reflectance sensor.
//!
//! The wheel releases a ball every `degrees_per_ball` of forward rotation;
//! the ball then sits in front of the sensor for `ball_pass`. Position is
//! integrated lazily from the commanded speed whenever a handle is queried,
//! using the injected clock, so a `ManualClock` makes the rig fully
//! deterministic.
//!
//! A jammed wheel ignores forward motion until it is turned backwards.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use pacer_traits::{Actuator, Clock, HwResult, ReflectanceSensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::HwError;

#[derive(Debug, Clone)]
pub struct SimRigCfg {
    pub degrees_per_ball: f64,
    pub ball_pass: Duration,
    pub reflect_low: i32,
    pub reflect_high: i32,
    /// Chance per second of running forward that the wheel jams by itself.
    pub jam_chance_per_s: f64,
    pub seed: Option<u64>,
}

impl Default for SimRigCfg {
    fn default() -> Self {
        Self {
            degrees_per_ball: 125.0,
            ball_pass: Duration::from_millis(40),
            reflect_low: 2,
            reflect_high: 40,
            jam_chance_per_s: 0.0,
            seed: None,
        }
    }
}

#[derive(Debug)]
struct RigState {
    angle: f64,
    /// deg/s; 0 when stopped.
    speed: f64,
    last_update: Instant,
    /// Index of the last wheel slot that released a ball.
    released_slot: i64,
    last_release: Option<Instant>,
    balls: u64,
    jammed: bool,
    rng: StdRng,
}

impl RigState {
    fn advance(&mut self, cfg: &SimRigCfg, now: Instant) {
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        if dt <= 0.0 || self.speed == 0.0 {
            return;
        }
        if self.speed > 0.0 && !self.jammed && cfg.jam_chance_per_s > 0.0 {
            let p = 1.0 - (1.0 - cfg.jam_chance_per_s).powf(dt);
            if self.rng.gen_bool(p.clamp(0.0, 1.0)) {
                self.jammed = true;
                tracing::debug!(angle = self.angle, "sim wheel jammed");
            }
        }
        if self.jammed && self.speed > 0.0 {
            return;
        }
        self.angle += self.speed * dt;
        self.release_balls(cfg, now);
    }

    fn release_balls(&mut self, cfg: &SimRigCfg, now: Instant) {
        let slot = (self.angle / cfg.degrees_per_ball).floor() as i64;
        if slot <= self.released_slot {
            return;
        }
        let crossed = u64::try_from(slot - self.released_slot).unwrap_or(0);
        self.balls = self.balls.saturating_add(crossed);
        self.released_slot = slot;
        // Back-date the release to when the wheel actually crossed the slot edge.
        let past_edge = self.angle - slot as f64 * cfg.degrees_per_ball;
        let since = if self.speed > 0.0 {
            Duration::from_secs_f64((past_edge / self.speed).max(0.0))
        } else {
            Duration::ZERO
        };
        self.last_release = Some(now.checked_sub(since).unwrap_or(now));
    }
}

/// Shared simulation; hand out sensor and actuator handles from it.
#[derive(Clone)]
pub struct SimRig {
    state: Arc<Mutex<RigState>>,
    clock: Arc<dyn Clock + Send + Sync>,
    cfg: Arc<SimRigCfg>,
}

impl core::fmt::Debug for SimRig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimRig")
            .field("cfg", &self.cfg)
            .field("balls", &self.balls_released())
            .finish()
    }
}

impl SimRig {
    pub fn new(cfg: SimRigCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = RigState {
            angle: 0.0,
            speed: 0.0,
            last_update: clock.now(),
            released_slot: 0,
            last_release: None,
            balls: 0,
            jammed: false,
            rng,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
            cfg: Arc::new(cfg),
        }
    }

    pub fn sensor(&self) -> SimSensor {
        SimSensor { rig: self.clone() }
    }

    pub fn actuator(&self) -> SimActuator {
        SimActuator { rig: self.clone() }
    }

    /// Jam the wheel now.
    pub fn jam(&self) {
        if let Ok(mut st) = self.lock() {
            st.advance(&self.cfg, self.clock.now());
            st.jammed = true;
        }
    }

    pub fn is_jammed(&self) -> bool {
        self.lock().map(|st| st.jammed).unwrap_or(false)
    }

    /// Balls released since start.
    pub fn balls_released(&self) -> u64 {
        match self.lock() {
            Ok(mut st) => {
                st.advance(&self.cfg, self.clock.now());
                st.balls
            }
            Err(_) => 0,
        }
    }

    /// Current commanded speed in deg/s (0 when stopped).
    pub fn speed(&self) -> f64 {
        self.lock().map(|st| st.speed).unwrap_or(0.0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, RigState>, HwError> {
        self.state
            .lock()
            .map_err(|_| HwError::Actuator("sim rig state poisoned".into()))
    }
}

/// Reflectance sensor watching the chute below the wheel.
#[derive(Debug, Clone)]
pub struct SimSensor {
    rig: SimRig,
}

impl ReflectanceSensor for SimSensor {
    fn reflection(&mut self) -> HwResult<i32> {
        let now = self.rig.clock.now();
        let cfg = &self.rig.cfg;
        let mut st = self.rig.lock()?;
        st.advance(cfg, now);
        let present = st
            .last_release
            .is_some_and(|t| now.saturating_duration_since(t) < cfg.ball_pass);
        Ok(if present {
            cfg.reflect_high
        } else {
            cfg.reflect_low
        })
    }
}

/// Release wheel motor.
#[derive(Debug, Clone)]
pub struct SimActuator {
    rig: SimRig,
}

impl Actuator for SimActuator {
    fn run(&mut self, speed: f64) -> HwResult<()> {
        if !speed.is_finite() {
            return Err(Box::new(HwError::Actuator(format!(
                "non-finite speed {speed}"
            ))));
        }
        let now = self.rig.clock.now();
        let mut st = self.rig.lock()?;
        st.advance(&self.rig.cfg, now);
        st.speed = speed;
        tracing::trace!(speed, "sim motor run");
        Ok(())
    }

    fn stop(&mut self) -> HwResult<()> {
        let now = self.rig.clock.now();
        let mut st = self.rig.lock()?;
        st.advance(&self.rig.cfg, now);
        st.speed = 0.0;
        tracing::trace!("sim motor stop");
        Ok(())
    }

    fn run_angle(&mut self, speed: f64, degrees: u32) -> HwResult<()> {
        if speed == 0.0 || !speed.is_finite() {
            return Err(Box::new(HwError::Actuator(format!(
                "run_angle needs a non-zero speed, got {speed}"
            ))));
        }
        let duration = Duration::try_from_secs_f64(f64::from(degrees) / speed.abs())
            .map_err(|e| HwError::Actuator(format!("run_angle at {speed} deg/s: {e}")))?;
        {
            let now = self.rig.clock.now();
            let mut st = self.rig.lock()?;
            st.advance(&self.rig.cfg, now);
            st.speed = 0.0;
        }
        // Lock released while the move runs so other handles stay usable.
        self.rig.clock.sleep(duration);
        let now = self.rig.clock.now();
        let mut st = self.rig.lock()?;
        st.last_update = now;
        if speed < 0.0 {
            st.angle -= f64::from(degrees);
            st.jammed = false;
        } else if !st.jammed {
            st.angle += f64::from(degrees);
            st.release_balls(&self.rig.cfg, now);
        }
        tracing::trace!(speed, degrees, angle = st.angle, "sim motor run_angle done");
        Ok(())
    }

    fn angle(&mut self) -> HwResult<i64> {
        let now = self.rig.clock.now();
        let mut st = self.rig.lock()?;
        st.advance(&self.rig.cfg, now);
        Ok(st.angle.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_traits::ManualClock;

    fn rig(clock: &ManualClock) -> SimRig {
        SimRig::new(
            SimRigCfg {
                seed: Some(1),
                ..SimRigCfg::default()
            },
            Arc::new(clock.clone()),
        )
    }

    #[test]
    fn angle_integrates_speed() {
        let clock = ManualClock::new();
        let rig = rig(&clock);
        let mut motor = rig.actuator();
        motor.run(100.0).unwrap();
        clock.advance_ms(1500);
        assert_eq!(motor.angle().unwrap(), 150);
        motor.stop().unwrap();
        clock.advance_ms(1000);
        assert_eq!(motor.angle().unwrap(), 150);
    }

    #[test]
    fn jam_blocks_forward_and_reverse_clears_it() {
        let clock = ManualClock::new();
        let rig = rig(&clock);
        let mut motor = rig.actuator();
        motor.run(100.0).unwrap();
        clock.advance_ms(100);
        rig.jam();
        clock.advance_ms(1000);
        assert_eq!(motor.angle().unwrap(), 10);
        motor.run_angle(-200.0, 20).unwrap();
        assert!(!rig.is_jammed());
        assert_eq!(motor.angle().unwrap(), -10);
        // 20 deg at 200 deg/s
        assert_eq!(clock.offset(), Duration::from_millis(1200));
    }

    #[test]
    fn run_angle_rejects_unrepresentable_move() {
        let clock = ManualClock::new();
        let rig = rig(&clock);
        let mut motor = rig.actuator();
        let err = motor.run_angle(-1e-30, 20).unwrap_err();
        assert!(err.to_string().contains("run_angle"));
        assert_eq!(clock.offset(), Duration::ZERO);
    }
}
