use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use serde::Serialize;

use rcplink_link::{LineConfig, LinkStream};

use crate::cmd::ProbeArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ProbeOutput {
    target: String,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

#[derive(Clone, Copy, Debug)]
enum TargetClass {
    CharDevice,
    RegularFile,
    Other,
    Missing,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let class = classify(&args.target);
    let checks = vec![
        target_class_check(&args.target, class),
        line_spec_check(&args.line, class),
        compiled_features_check(),
        link_open_check(&args.target, &args.line),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = ProbeOutput {
        target: args.target.display().to_string(),
        checks,
        overall,
    };

    print_probe(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn classify(path: &Path) -> TargetClass {
    match fs::metadata(path) {
        Ok(meta) if meta.file_type().is_char_device() => TargetClass::CharDevice,
        Ok(meta) if meta.is_file() => TargetClass::RegularFile,
        Ok(_) => TargetClass::Other,
        Err(_) => TargetClass::Missing,
    }
}

fn target_class_check(path: &Path, class: TargetClass) -> CheckResult {
    let (status, detail) = match class {
        TargetClass::CharDevice => (CheckStatus::Pass, "character device".to_string()),
        TargetClass::RegularFile => (
            CheckStatus::Pass,
            "regular file (subprocess link)".to_string(),
        ),
        TargetClass::Other => (
            CheckStatus::Fail,
            format!(
                "{} is neither a character device nor a regular file",
                path.display()
            ),
        ),
        TargetClass::Missing => (CheckStatus::Fail, format!("{} does not exist", path.display())),
    };

    CheckResult {
        name: "target_class".to_string(),
        status,
        detail,
    }
}

fn line_spec_check(spec: &str, class: TargetClass) -> CheckResult {
    if matches!(class, TargetClass::RegularFile) {
        return CheckResult {
            name: "line_spec".to_string(),
            status: CheckStatus::Skip,
            detail: "passed to the subprocess as arguments".to_string(),
        };
    }

    let (status, detail) = match spec.parse::<LineConfig>() {
        Ok(config) if spec.is_empty() => (CheckStatus::Pass, format!("defaults to {config}")),
        Ok(config) => (CheckStatus::Pass, config.to_string()),
        Err(err) => (CheckStatus::Fail, err.to_string()),
    };

    CheckResult {
        name: "line_spec".to_string(),
        status,
        detail,
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "pty") {
        features.push("pty");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

fn link_open_check(path: &Path, line: &str) -> CheckResult {
    let name = "link_open".to_string();
    match LinkStream::open(path, line) {
        Ok(link) => {
            let tty = if link.is_terminal() { "tty" } else { "not a tty" };
            let mut detail = format!("opened as {} ({tty})", link.kind());
            if let Some(pid) = link.child_id() {
                detail.push_str(&format!(", subprocess pid {pid}"));
            }
            match link.close() {
                Ok(()) => CheckResult {
                    name,
                    status: CheckStatus::Pass,
                    detail,
                },
                Err(err) => CheckResult {
                    name,
                    status: CheckStatus::Fail,
                    detail: format!("close failed: {err}"),
                },
            }
        }
        Err(err) => CheckResult {
            name,
            status: CheckStatus::Fail,
            detail: err.to_string(),
        },
    }
}

fn print_probe(output: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("rcplink probe: {}\n", output.target);
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_output_has_overall_status() {
        let checks = vec![CheckResult {
            name: "x".to_string(),
            status: CheckStatus::Pass,
            detail: "ok".to_string(),
        }];
        let output = ProbeOutput {
            target: "/dev/null".to_string(),
            checks,
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("probe output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
    }

    #[test]
    fn missing_target_fails_the_class_check() {
        let path = Path::new("/nonexistent/rcp-device");
        let check = target_class_check(path, classify(path));
        assert!(matches!(check.status, CheckStatus::Fail));
        assert!(check.detail.contains("does not exist"));
    }

    #[test]
    fn bad_line_spec_fails_for_serial_targets() {
        let check = line_spec_check("9600X1", TargetClass::CharDevice);
        assert!(matches!(check.status, CheckStatus::Fail));
    }

    #[test]
    fn line_spec_is_skipped_for_subprocess_targets() {
        let check = line_spec_check("--radio-version", TargetClass::RegularFile);
        assert!(matches!(check.status, CheckStatus::Skip));
    }

    #[test]
    fn null_device_probes_clean() {
        let path = Path::new("/dev/null");
        assert!(matches!(classify(path), TargetClass::CharDevice));
        let check = link_open_check(path, "");
        assert!(matches!(check.status, CheckStatus::Pass));
        assert!(check.detail.contains("serial"));
    }
}
