//! The open byte channel to a co-processor.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{LinkError, Result};
use crate::line::LineConfig;
#[cfg(feature = "pty")]
use crate::pty::PtyChild;

/// A connected link — implements Read + Write.
///
/// Wraps either a character device opened as a serial line or the
/// master side of a pseudo-terminal with a subprocess behind it. The
/// descriptor is always non-blocking; callers drive it with
/// [`LinkStream::wait_readable`] and short reads.
pub struct LinkStream {
    inner: LinkInner,
}

enum LinkInner {
    Serial(File),
    #[cfg(feature = "pty")]
    Pty(PtyChild),
}

impl LinkStream {
    /// Opens the link target at `path`.
    ///
    /// Character devices are opened directly; if the descriptor is a
    /// terminal, `config` is parsed as a line specification (for
    /// example `"115200N1"`) and programmed onto it. Regular files are
    /// treated as executables and spawned behind a pseudo-terminal with
    /// `config` as their argument string. Anything else is rejected.
    pub fn open(path: impl AsRef<Path>, config: &str) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| LinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let file_type = metadata.file_type();

        if file_type.is_char_device() {
            Self::open_serial(path, config)
        } else if file_type.is_file() {
            Self::spawn_subprocess(path, config)
        } else {
            Err(LinkError::UnsupportedTarget {
                path: path.to_path_buf(),
            })
        }
    }

    fn open_serial(path: &Path, config: &str) -> Result<Self> {
        use std::os::unix::fs::OpenOptionsExt;

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| LinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let fd = file.as_raw_fd();
        // SAFETY: `fd` is an open descriptor owned by `file`.
        if unsafe { libc::isatty(fd) } == 1 {
            let line: LineConfig = config.parse()?;
            line.apply(fd)?;
            debug!(path = ?path, %line, "programmed serial line");
        } else {
            debug!(path = ?path, "character device is not a terminal, leaving line untouched");
        }

        info!(path = ?path, "opened serial link");
        Ok(Self {
            inner: LinkInner::Serial(file),
        })
    }

    #[cfg(feature = "pty")]
    fn spawn_subprocess(path: &Path, config: &str) -> Result<Self> {
        let pty = PtyChild::spawn(path, config)?;
        Ok(Self {
            inner: LinkInner::Pty(pty),
        })
    }

    #[cfg(not(feature = "pty"))]
    fn spawn_subprocess(path: &Path, _config: &str) -> Result<Self> {
        Err(LinkError::UnsupportedTarget {
            path: path.to_path_buf(),
        })
    }

    /// Waits until the link has bytes to read, a hangup, or the
    /// timeout. Returns whether a read is worth attempting now.
    pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let fd = match &self.inner {
            LinkInner::Serial(file) => file.as_raw_fd(),
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => pty.master_fd()?,
        };
        poll_readable(fd, timeout)
    }

    /// Whether the descriptor is a terminal. True for real UARTs and
    /// pseudo-terminal masters, false for non-tty character devices.
    pub fn is_terminal(&self) -> bool {
        let fd = match &self.inner {
            LinkInner::Serial(file) => file.as_raw_fd(),
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => match pty.master_fd() {
                Ok(fd) => fd,
                Err(_) => return false,
            },
        };
        // SAFETY: `fd` is an open descriptor owned by this stream.
        unsafe { libc::isatty(fd) == 1 }
    }

    /// Transport name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            LinkInner::Serial(_) => "serial",
            #[cfg(feature = "pty")]
            LinkInner::Pty(_) => "pty",
        }
    }

    /// Process id of the subprocess behind a pseudo-terminal link.
    pub fn child_id(&self) -> Option<u32> {
        match &self.inner {
            LinkInner::Serial(_) => None,
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => Some(pty.child_id()),
        }
    }

    /// Tears the link down. Serial descriptors are simply closed;
    /// subprocess links hang up the terminal and then reap the child,
    /// waiting indefinitely for one that ignores the hangup.
    pub fn close(self) -> Result<()> {
        match self.inner {
            LinkInner::Serial(file) => {
                drop(file);
                info!("closed serial link");
                Ok(())
            }
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => {
                pty.close().map_err(LinkError::Io)?;
                info!("closed subprocess link");
                Ok(())
            }
        }
    }
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            LinkInner::Serial(file) => file.read(buf),
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => pty.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            LinkInner::Serial(file) => file.write(buf),
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => pty.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            LinkInner::Serial(file) => file.flush(),
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => pty.flush(),
        }
    }
}

impl AsRawFd for LinkStream {
    fn as_raw_fd(&self) -> RawFd {
        match &self.inner {
            LinkInner::Serial(file) => file.as_raw_fd(),
            #[cfg(feature = "pty")]
            LinkInner::Pty(pty) => pty.master_fd().unwrap_or(-1),
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &self.kind())
            .finish()
    }
}

fn poll_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
    // SAFETY: `pollfd` is a valid one-entry array for the duration of
    // the call.
    let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
    match rc {
        -1 => {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(err)
            }
        }
        0 => Ok(false),
        // Hangups and errors wake the caller too, so the next read can
        // observe them.
        _ => Ok(pollfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0),
    }
}
