//! Subprocess links behind a pseudo-terminal.
//!
//! When the link target is a regular file it is treated as an RCP
//! executable (an emulator or test harness) and spawned with the slave
//! side of a fresh pseudo-terminal as its controlling terminal. The
//! master side then behaves exactly like a serial descriptor to the
//! rest of the stack.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command};

use tracing::{debug, info};

use crate::error::{LinkError, Result};

/// Longest supported `<program> <arguments>` command line.
const MAX_COMMAND: usize = 255;

/// A subprocess wired to the slave side of a pseudo-terminal, with the
/// master side held here.
#[derive(Debug)]
pub struct PtyChild {
    /// Taken on close so the terminal hangs up before the child is
    /// reaped.
    master: Option<File>,
    child: Child,
}

impl PtyChild {
    /// Spawns `program` with `args` appended to its command line,
    /// running under `$SHELL -c "exec ..."` (falling back to `/bin/sh`)
    /// so the target resolves the way it would from an interactive
    /// session.
    pub(crate) fn spawn(program: &Path, args: &str) -> Result<Self> {
        let command = format!("exec {} {}", program.display(), args);
        if command.len() >= MAX_COMMAND {
            return Err(LinkError::CommandTooLong {
                len: command.len(),
                max: MAX_COMMAND,
            });
        }

        let (master, slave) = open_raw_pty()?;
        set_nonblocking_cloexec(master.as_raw_fd())?;

        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        debug!(%shell, %command, "spawning subprocess link");

        let mut cmd = Command::new(&shell);
        cmd.arg("-c")
            .arg(&command)
            .stdin(slave.try_clone()?)
            .stdout(slave.try_clone()?)
            .stderr(slave.try_clone()?);
        drop(slave);
        // SAFETY: only async-signal-safe calls run between fork and
        // exec. Stdin is already the pty slave when the hook runs, so
        // it doubles as the target of the controlling-terminal claim.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|source| LinkError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

        info!(program = %program.display(), pid = child.id(), "spawned subprocess link");
        Ok(Self {
            master: Some(master),
            child,
        })
    }

    /// Process id of the subprocess.
    pub fn child_id(&self) -> u32 {
        self.child.id()
    }

    pub(crate) fn master_fd(&self) -> io::Result<RawFd> {
        match &self.master {
            Some(master) => Ok(master.as_raw_fd()),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    /// Hangs up the terminal and reaps the subprocess. Waits
    /// indefinitely for a subprocess that ignores the hangup.
    pub(crate) fn close(mut self) -> io::Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if let Some(master) = self.master.take() {
            drop(master);
            let status = self.child.wait()?;
            debug!(pid = self.child.id(), %status, "reaped subprocess link");
        }
        Ok(())
    }
}

impl Read for PtyChild {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.master {
            // On Linux a master read fails with EIO once the child has
            // exited and every slave descriptor is closed. That is this
            // transport's end of stream, so report it as one.
            Some(master) => match master.read(buf) {
                Err(err) if err.raw_os_error() == Some(libc::EIO) => Ok(0),
                other => other,
            },
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}

impl Write for PtyChild {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.master {
            Some(master) => master.write(buf),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.master {
            Some(master) => master.flush(),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}

impl Drop for PtyChild {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Opens a pseudo-terminal pair with the slave already in raw mode, the
/// same control flags a directly opened serial line gets.
fn open_raw_pty() -> Result<(File, File)> {
    // SAFETY: `tios` is a valid zeroed termios and cfmakeraw only
    // writes through the provided pointer.
    let mut tios: libc::termios = unsafe { std::mem::zeroed() };
    unsafe { libc::cfmakeraw(&mut tios) };
    tios.c_cflag = libc::CS8 | libc::HUPCL | libc::CREAD | libc::CLOCAL;

    let mut master: libc::c_int = -1;
    let mut slave: libc::c_int = -1;
    // SAFETY: out-params and the termios are valid pointers for the
    // duration of the call; a null winsize selects the default.
    let rc = unsafe {
        libc::openpty(
            &mut master,
            &mut slave,
            std::ptr::null_mut(),
            &mut tios,
            std::ptr::null_mut(),
        )
    };
    if rc != 0 {
        return Err(LinkError::Io(io::Error::last_os_error()));
    }
    // SAFETY: openpty handed us ownership of both descriptors.
    Ok(unsafe { (File::from_raw_fd(master), File::from_raw_fd(slave)) })
}

/// Marks the master non-blocking and close-on-exec, keeping it out of
/// the subprocess and anything else this process executes.
fn set_nonblocking_cloexec(fd: RawFd) -> Result<()> {
    // SAFETY: `fd` is an open descriptor owned by the caller.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags == -1 {
            return Err(LinkError::Io(io::Error::last_os_error()));
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
            return Err(LinkError::Io(io::Error::last_os_error()));
        }
        if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) == -1 {
            return Err(LinkError::Io(io::Error::last_os_error()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn read_echo(pty: &mut PtyChild, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut out = Vec::new();
        let mut buf = [0u8; 256];
        while out.len() < want && Instant::now() < deadline {
            match pty.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => panic!("read failed: {e}"),
            }
        }
        out
    }

    #[test]
    fn cat_echoes_raw_bytes() {
        let mut pty = PtyChild::spawn(Path::new("/bin/cat"), "").unwrap();
        pty.write_all(b"\x01\x7e\x42").unwrap();
        let echoed = read_echo(&mut pty, 3);
        assert_eq!(echoed, b"\x01\x7e\x42");
        pty.close().unwrap();
    }

    #[test]
    fn close_reaps_the_subprocess() {
        let pty = PtyChild::spawn(Path::new("/bin/cat"), "").unwrap();
        assert!(pty.child_id() > 0);
        pty.close().unwrap();
    }

    #[test]
    fn oversize_command_line_is_rejected() {
        let args = "x".repeat(300);
        let result = PtyChild::spawn(Path::new("/bin/cat"), &args);
        assert!(matches!(result, Err(LinkError::CommandTooLong { .. })));
    }

    #[test]
    fn exited_subprocess_reads_as_end_of_stream() {
        let mut pty = PtyChild::spawn(Path::new("/bin/true"), "").unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut buf = [0u8; 64];
        loop {
            match pty.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    assert!(Instant::now() < deadline, "no hangup before deadline");
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => panic!("expected end of stream, got {e}"),
            }
        }
        pty.close().unwrap();
    }
}
