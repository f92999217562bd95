use std::fmt;
use std::io;

use rcplink_driver::DriverError;
use rcplink_link::LinkError;

// Exit code constants shared across subcommands.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const LINK_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => LINK_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Open { source, .. }
        | LinkError::Termios { source, .. }
        | LinkError::Spawn { source, .. }
        | LinkError::Io(source) => io_error(context, source),
        LinkError::BadLineSpec { .. }
        | LinkError::UnsupportedRate { .. }
        | LinkError::UnsupportedTarget { .. }
        | LinkError::CommandTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn driver_error(context: &str, err: DriverError) -> CliError {
    match err {
        DriverError::Link(err) => link_error(context, err),
        DriverError::Read { source } | DriverError::Write { source } => io_error(context, source),
        DriverError::Encode(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        DriverError::AlreadyOpen | DriverError::NotOpen => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
    }
}
