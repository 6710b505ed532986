use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[collision]
stop_hold_ms = 0
flash_count = 1
flash_interval_ms = 1
reverse_ms = 0
settle_ms = 0
pivot_ms = 0
play_tune = false

[logging]
level = "error"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn run_json(cfg: &PathBuf, args: &[&str]) -> std::process::Output {
    let mut cmd = Command::cargo_bin("linebot").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(cfg)
        .arg("--json");
    for a in args {
        cmd.arg(a);
    }
    cmd.output().unwrap()
}

fn last_json_line(bytes: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(bytes);
    let line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON line in: {text}"));
    serde_json::from_str(line).unwrap()
}

#[rstest]
#[case(&["run", "--max-run-ms", "80"], "stopped")]
#[case(&["run", "--max-run-ms", "3000", "--bump-after-ms", "30", "--bump-mask", "0b0010"], "halted")]
fn run_summary_schema(#[case] args: &[&str], #[case] outcome: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = run_json(&cfg, args);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v = last_json_line(&out.stdout);
    assert_eq!(v["outcome"], outcome);
    for key in ["ticks", "acquisitions", "control_periods", "overruns", "elapsed_ms"] {
        assert!(v[key].is_u64(), "{key} missing or not a count: {v}");
    }
    assert!(v["final_state"].is_string());
    if outcome == "halted" {
        assert_eq!(v["bump_mask"], 2);
    } else {
        assert!(v["bump_mask"].is_null());
    }
}

#[test]
fn self_check_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = run_json(&cfg, &["self-check"]);
    assert!(out.status.success());

    let v = last_json_line(&out.stdout);
    assert_eq!(v["ok"], true);
    assert_eq!(v["bitmap"], "00011000");
    assert_eq!(v["offset"], 0);
    assert_eq!(v["state"], "CENTER");
}

#[test]
fn config_error_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[drive]\nnominal = 3500\nswing = 4000\n").unwrap();
    let out = run_json(&path, &["self-check"]);
    assert_eq!(out.status.code(), Some(2));

    let v = last_json_line(&out.stderr);
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 2);
    assert!(v["message"].as_str().unwrap().contains("swing"));
}
