//! Serial and pseudo-terminal link acquisition for RCP transports.
//!
//! A link target is classified by file type. Character devices are
//! opened directly as serial lines, with termios programmed from a
//! compact `"115200N1"` specification. Regular files are treated as
//! executables to spawn behind a pseudo-terminal, which is how RCP
//! emulators and test harnesses are wired up. Either way the result is
//! a non-blocking Read + Write stream.
//!
//! This crate is POSIX-only.

pub mod error;
pub mod line;
#[cfg(all(unix, feature = "pty"))]
pub mod pty;
#[cfg(unix)]
pub mod stream;

pub use error::{LinkError, Result};
pub use line::{LineConfig, Parity, StopBits};
#[cfg(all(unix, feature = "pty"))]
pub use pty::PtyChild;
#[cfg(unix)]
pub use stream::LinkStream;
