//! Human-readable error descriptions, JSON error output and exit codes.

use linebot_core::error::{BuildError, TrackerError};

/// Tag an error as a configuration problem (exit code 2).
pub fn config_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(TrackerError::Config(msg.into()))
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No line sensor was provided to the tracker.\nLikely causes: The sensor backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingMotor => {
                "What happened: No motor driver was provided to the tracker.\nLikely causes: The motor backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the motor is created successfully and passed via with_motor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TrackerError>() {
        return match te {
            TrackerError::Config(msg) if msg.contains("must have headers") => {
                "Invalid headers in track CSV. Expected 'cycles,bitmap'.".to_string()
            }
            TrackerError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A TOML value or track script row is missing or out of range.\nHow to fix: Edit the config or track file and try again."
            ),
            TrackerError::HardwareFault(msg) => format!(
                "What happened: A GPIO or PWM operation failed ({msg}).\nLikely causes: Wrong pin numbers in [pins] or insufficient GPIO permissions.\nHow to fix: Check the [pins] section and run with access to /dev/gpiomem."
            ),
            TrackerError::Hardware(msg) => format!(
                "What happened: A peripheral reported an error ({msg}).\nLikely causes: Sensor or motor driver not responding.\nHow to fix: Check wiring and power, then re-run with --log-level=debug."
            ),
            TrackerError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: The robot already halted after a collision.\nHow to fix: Restart the program to clear the halt."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// 2 for configuration problems, 1 for everything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    let is_config = err
        .chain()
        .any(|c| {
            matches!(c.downcast_ref::<TrackerError>(), Some(TrackerError::Config(_)))
                || matches!(c.downcast_ref::<BuildError>(), Some(BuildError::InvalidConfig(_)))
        });
    if is_config { 2 } else { 1 }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor | BuildError::MissingMotor => "Build",
            BuildError::InvalidConfig(_) => "Config",
        };
    }
    match err.downcast_ref::<TrackerError>() {
        Some(TrackerError::Config(_)) => "Config",
        Some(TrackerError::HardwareFault(_)) => "HardwareFault",
        Some(TrackerError::Hardware(_)) => "Hardware",
        Some(TrackerError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "exit_code": exit_code_for_error(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let e = config_error("schedule.tick_hz must be > 0");
        assert_eq!(exit_code_for_error(&e), 2);
        assert!(humanize(&e).contains("tick_hz"));
    }

    #[test]
    fn wrapped_build_config_errors_still_exit_with_two() {
        use eyre::WrapErr;
        let e: eyre::Result<()> = Err(eyre::Report::new(BuildError::InvalidConfig(
            "center_band must be > 0",
        )));
        let e = e.wrap_err("building simulated tracker").unwrap_err();
        assert_eq!(exit_code_for_error(&e), 2);
    }

    #[test]
    fn hardware_errors_exit_with_one() {
        let e = eyre::Report::new(TrackerError::HardwareFault("pin 17 busy".into()));
        assert_eq!(exit_code_for_error(&e), 1);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "HardwareFault");
    }

    #[test]
    fn csv_header_errors_get_a_short_hint() {
        let e = config_error("track CSV must have headers 'cycles,bitmap', got: a,b");
        assert_eq!(humanize(&e), "Invalid headers in track CSV. Expected 'cycles,bitmap'.");
    }
}
