use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod dump;
pub mod probe;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every frame decoded from the link.
    Dump(DumpArgs),
    /// Encode and transmit a single frame.
    Send(SendArgs),
    /// Check whether a target can carry a framed link.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Dump(args) => dump::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Link target: a serial device node, or an executable to spawn
    /// behind a pseudo-terminal.
    pub target: PathBuf,
    /// Line specification for serial targets (e.g. 115200N1; default
    /// 115200N1), or extra arguments for subprocess targets.
    #[arg(long, default_value = "")]
    pub line: String,
    /// Exit after decoding N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Stop dumping after this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Link target: a serial device node, or an executable to spawn
    /// behind a pseudo-terminal.
    pub target: PathBuf,
    /// Line specification for serial targets (e.g. 115200N1; default
    /// 115200N1), or extra arguments for subprocess targets.
    #[arg(long, default_value = "")]
    pub line: String,
    /// Frame payload as hex digits (whitespace and colons ignored).
    #[arg(long, conflicts_with = "text")]
    pub hex: Option<String>,
    /// Frame payload as literal text.
    #[arg(long, conflicts_with = "hex")]
    pub text: Option<String>,
    /// Wait for one decoded response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the response when --wait is set
    /// (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Link target to examine.
    pub target: PathBuf,
    /// Line specification to validate against the target.
    #[arg(long, default_value = "")]
    pub line: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
