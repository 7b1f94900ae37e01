#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pacer_core::mocks::{RecordingIndicator, ScriptedPanel};
use pacer_core::{
    Collaborators, NullSink, PacerG, PacerParams, RandomSource, TelemetrySink, TickReport,
    build_pacer,
};
use pacer_hardware::{SimActuator, SimRig, SimRigCfg, SimSensor};
use pacer_traits::ManualClock;

pub const TICK_MS: u64 = 5;

/// Controller wired to a simulated rig on a manual clock.
pub struct Harness {
    pub pacer: PacerG<SimSensor, SimActuator>,
    pub rig: SimRig,
    pub clock: ManualClock,
    pub indicator: RecordingIndicator,
    pub panel: ScriptedPanel,
}

impl Harness {
    pub fn new(params: PacerParams, rig_cfg: SimRigCfg) -> Self {
        Self::with_parts(params, rig_cfg, Box::new(NullSink), None)
    }

    pub fn with_parts(
        params: PacerParams,
        rig_cfg: SimRigCfg,
        sink: Box<dyn TelemetrySink>,
        rng: Option<Box<dyn RandomSource>>,
    ) -> Self {
        let clock = ManualClock::new();
        let rig = SimRig::new(rig_cfg, Arc::new(clock.clone()));
        let indicator = RecordingIndicator::default();
        let panel = ScriptedPanel::default();
        let parts = Collaborators {
            panel: Box::new(panel.clone()),
            indicator: Box::new(indicator.clone()),
            sink,
            rng,
            seed: Some(7),
            clock: Some(Arc::new(clock.clone())),
        };
        let mut pacer =
            build_pacer(rig.sensor(), rig.actuator(), params, parts).expect("valid params");
        pacer.begin().expect("begin");
        Self {
            pacer,
            rig,
            clock,
            indicator,
            panel,
        }
    }

    /// Tick every `TICK_MS` for `ms` of simulated time.
    pub fn run_ms(&mut self, ms: u64) -> Vec<TickReport> {
        let end = self.clock.offset() + Duration::from_millis(ms);
        let mut reports = Vec::new();
        while self.clock.offset() < end {
            reports.push(self.pacer.tick().expect("tick"));
            self.clock.advance_ms(TICK_MS);
        }
        reports
    }
}
