//! Human-readable error descriptions, exit codes and structured JSON errors.

use pacer_core::error::{BuildError, PacerError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No reflectance sensor was provided to the controller.\nLikely causes: The sensor backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No wheel motor was provided to the controller.\nLikely causes: The motor backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the motor is created and passed via with_actuator(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid controller parameters ({msg}).\nLikely causes: Out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or the overrides, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PacerError>() {
        return match pe {
            PacerError::Hardware(_) => format!(
                "What happened: {pe}.\nLikely causes: Device unplugged, permissions, or an I/O failure on the bus.\nHow to fix: Check cabling and device permissions, then restart the run."
            ),
            PacerError::HardwareFault(_) => format!(
                "What happened: {pe}.\nLikely causes: Motor or sensor reported a fault (overload, stalled beyond recovery).\nHow to fix: Clear the mechanism, check the wheel turns freely, then restart."
            ),
            PacerError::Config(msg) => format!(
                "What happened: Configuration is invalid.\nLikely causes: Out-of-range values ({msg}).\nHow to fix: Edit the TOML config or the command-line overrides and try again."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Check the path and rerun. Original: {msg}"
        );
    }

    if lower.contains("parse config") || lower.contains("toml") {
        return format!(
            "What happened: The config file is not valid TOML for this program.\nLikely causes: A typo, an unknown key type, or a broken section header.\nHow to fix: Compare with etc/pacer_config.toml. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: Out-of-range values ({msg}).\nHow to fix: Edit the TOML config or the command-line overrides and try again."
        );
    }

    if lower.contains("button pins") || lower.contains("led pins") || lower.contains("gpio") {
        return "What happened: Failed to initialize GPIO pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem.".to_string();
    }

    if lower.contains("telemetry") {
        return format!(
            "What happened: Telemetry output failed.\nLikely causes: The CSV path is not writable.\nHow to fix: Pick another --telemetry-csv path. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for the error class.
pub fn error_kind(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<PacerError>() {
        Some(PacerError::Hardware(_)) => "Hardware",
        Some(PacerError::HardwareFault(_)) => "HardwareFault",
        Some(PacerError::Config(_)) => "Config",
        None if format!("{err:#}").to_ascii_lowercase().contains("config") => "Config",
        None => "Error",
    }
}

/// Exit codes: 3 configuration, 4 hardware, 1 anything else.
/// Argument errors exit with clap's 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match error_kind(err) {
        "Build" | "Config" => 3,
        "Hardware" | "HardwareFault" => 4,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": error_kind(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn build_errors_are_config_class() {
        let err = eyre::Report::new(BuildError::InvalidConfig("target rate must be > 0"));
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("target rate must be > 0"));
    }

    #[test]
    fn wrapped_hardware_fault_keeps_its_class() {
        let err: eyre::Result<()> =
            Err(eyre::Report::new(PacerError::HardwareFault("stalled".into())));
        let err = err.wrap_err("wheel run").unwrap_err();
        assert_eq!(error_kind(&err), "HardwareFault");
        assert_eq!(exit_code_for_error(&err), 4);
    }

    #[test]
    fn config_errors_explain_the_offending_key() {
        let err = eyre::Report::new(PacerError::Config(
            "antiblock.unblock_speed magnitude must be >= 1 deg/s".into(),
        ));
        assert_eq!(error_kind(&err), "Config");
        assert_eq!(exit_code_for_error(&err), 3);
        let text = humanize(&err);
        assert!(text.contains("Configuration is invalid"));
        assert!(text.contains("antiblock.unblock_speed"));
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let err = eyre::eyre!("parse config \"x.toml\": expected `]`");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert_eq!(v["exit_code"], 3);
        assert!(v["message"].as_str().unwrap().contains("not valid TOML"));
    }
}
