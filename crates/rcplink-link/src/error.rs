use std::path::PathBuf;

/// Errors that can occur while acquiring, configuring, or tearing down
/// a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Failed to open or stat the link target.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The target is neither a character device nor an executable
    /// regular file.
    #[error("unsupported link target: {path}")]
    UnsupportedTarget { path: PathBuf },

    /// The line specification string did not parse.
    #[error("invalid line specification {spec:?} (expected e.g. \"115200N1\")")]
    BadLineSpec { spec: String },

    /// The requested baud rate has no line discipline entry on this
    /// platform.
    #[error("unsupported baud rate: {rate}")]
    UnsupportedRate { rate: u32 },

    /// A terminal configuration call failed.
    #[error("terminal setup failed in {op}: {source}")]
    Termios {
        op: &'static str,
        source: std::io::Error,
    },

    /// Spawning the subprocess behind the pseudo-terminal failed.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The subprocess command line exceeds the supported length.
    #[error("command line too long ({len} bytes, max {max})")]
    CommandTooLong { len: usize, max: usize },

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
