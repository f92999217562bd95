#![cfg(all(unix, feature = "cli"))]

use std::process::Command;

fn rcplink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rcplink"));
    cmd.arg("--log-level").arg("error");
    cmd
}

#[test]
fn version_prints_package_version() {
    let output = rcplink().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_reports_build_provenance() {
    let output = rcplink()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("max_frame_size: 1300"));
    assert!(stdout.contains("target_os:"));
}

#[test]
fn probe_null_device_passes() {
    let output = rcplink()
        .arg("--format")
        .arg("json")
        .arg("probe")
        .arg("/dev/null")
        .output()
        .expect("probe should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("probe output should be json");
    assert_eq!(report.get("overall").and_then(|v| v.as_str()), Some("pass"));
}

#[test]
fn probe_missing_target_fails_health_check() {
    let output = rcplink()
        .arg("--format")
        .arg("json")
        .arg("probe")
        .arg("/nonexistent/rcp-device")
        .output()
        .expect("probe should run");

    assert_eq!(output.status.code(), Some(30));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"overall\":\"fail\""));
}

#[test]
fn probe_flags_a_bad_line_spec() {
    let output = rcplink()
        .arg("--format")
        .arg("json")
        .arg("probe")
        .arg("/dev/null")
        .arg("--line")
        .arg("9600X1")
        .output()
        .expect("probe should run");

    assert_eq!(output.status.code(), Some(30));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("line_spec"), "stdout: {stdout}");
}

#[test]
fn send_rejects_a_bad_hex_payload() {
    let output = rcplink()
        .arg("send")
        .arg("/bin/cat")
        .arg("--hex")
        .arg("81gq")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("non-hex"), "stderr: {stderr}");
}

#[test]
fn send_to_a_missing_target_is_a_usage_error() {
    let output = rcplink()
        .arg("send")
        .arg("/nonexistent/rcp-device")
        .arg("--text")
        .arg("hi")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("open failed"), "stderr: {stderr}");
}
