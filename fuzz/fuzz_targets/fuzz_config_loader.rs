#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing, validation and the mapping into controller parameters must never panic.
    let Ok(cfg) = pacer_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let params = pacer_core::PacerParams::from(&cfg);
    let bounds = pacer_core::recompute_derived(&params.tuning);
    let _ = bounds.clamp_speed(bounds.initial_speed);
});
