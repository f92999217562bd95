//! Serial line configuration.
//!
//! A line is described by a compact specification string such as
//! `"115200N1"`: the baud rate, then optionally a parity letter and a
//! stop-bit count. Omitted fields default independently, so `"9600"`
//! means 9600N1 and the empty string means the full 115200N1 default.

use std::fmt;
use std::str::FromStr;

use crate::error::{LinkError, Result};

/// Parity bit generation and checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Serial line parameters applied to a terminal descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl FromStr for LineConfig {
    type Err = LinkError;

    fn from_str(spec: &str) -> Result<Self> {
        let bad = || LinkError::BadLineSpec {
            spec: spec.to_string(),
        };

        let mut config = Self::default();
        if spec.is_empty() {
            return Ok(config);
        }

        let bytes = spec.as_bytes();
        let digits_end = bytes
            .iter()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(bytes.len());
        if digits_end == 0 {
            return Err(bad());
        }
        config.baud_rate = spec[..digits_end].parse().map_err(|_| bad())?;

        let mut rest = bytes[digits_end..].iter();
        if let Some(&parity) = rest.next() {
            config.parity = match parity {
                b'N' => Parity::None,
                b'E' => Parity::Even,
                b'O' => Parity::Odd,
                _ => return Err(bad()),
            };
        }
        if let Some(&stop) = rest.next() {
            config.stop_bits = match stop {
                b'1' => StopBits::One,
                b'2' => StopBits::Two,
                _ => return Err(bad()),
            };
        }
        if rest.next().is_some() {
            return Err(bad());
        }
        Ok(config)
    }
}

impl fmt::Display for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        let stop = match self.stop_bits {
            StopBits::One => '1',
            StopBits::Two => '2',
        };
        write!(f, "{}{}{}", self.baud_rate, parity, stop)
    }
}

#[cfg(unix)]
impl LineConfig {
    /// Programs the descriptor with this configuration: raw mode, 8
    /// data bits, the requested parity, stop bits, and speed, then
    /// flushes driver buffers in both directions.
    pub fn apply(&self, fd: std::os::unix::io::RawFd) -> Result<()> {
        let speed = baud_flag(self.baud_rate).ok_or(LinkError::UnsupportedRate {
            rate: self.baud_rate,
        })?;

        // SAFETY: `tios` is a valid zeroed termios and cfmakeraw only
        // writes through the provided pointer.
        let mut tios: libc::termios = unsafe { std::mem::zeroed() };
        unsafe { libc::cfmakeraw(&mut tios) };

        tios.c_cflag = libc::CS8 | libc::HUPCL | libc::CREAD | libc::CLOCAL;
        match self.parity {
            Parity::None => {}
            Parity::Even => tios.c_cflag |= libc::PARENB,
            Parity::Odd => tios.c_cflag |= libc::PARENB | libc::PARODD,
        }
        if self.stop_bits == StopBits::Two {
            tios.c_cflag |= libc::CSTOPB;
        }

        // SAFETY: `tios` lives on this frame and `fd` is an open
        // descriptor owned by the caller.
        unsafe {
            if libc::cfsetspeed(&mut tios, speed) != 0 {
                return Err(termios_error("cfsetspeed"));
            }
            if libc::tcsetattr(fd, libc::TCSANOW, &tios) != 0 {
                return Err(termios_error("tcsetattr"));
            }
            if libc::tcflush(fd, libc::TCIOFLUSH) != 0 {
                return Err(termios_error("tcflush"));
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn termios_error(op: &'static str) -> LinkError {
    LinkError::Termios {
        op,
        source: std::io::Error::last_os_error(),
    }
}

#[cfg(unix)]
fn baud_flag(rate: u32) -> Option<libc::speed_t> {
    match rate {
        9600 => Some(libc::B9600),
        19200 => Some(libc::B19200),
        38400 => Some(libc::B38400),
        57600 => Some(libc::B57600),
        115200 => Some(libc::B115200),
        230400 => Some(libc::B230400),
        #[cfg(target_os = "linux")]
        460800 => Some(libc::B460800),
        #[cfg(target_os = "linux")]
        500000 => Some(libc::B500000),
        #[cfg(target_os = "linux")]
        576000 => Some(libc::B576000),
        #[cfg(target_os = "linux")]
        921600 => Some(libc::B921600),
        #[cfg(target_os = "linux")]
        1000000 => Some(libc::B1000000),
        #[cfg(target_os = "linux")]
        1152000 => Some(libc::B1152000),
        #[cfg(target_os = "linux")]
        1500000 => Some(libc::B1500000),
        #[cfg(target_os = "linux")]
        2000000 => Some(libc::B2000000),
        #[cfg(target_os = "linux")]
        2500000 => Some(libc::B2500000),
        #[cfg(target_os = "linux")]
        3000000 => Some(libc::B3000000),
        #[cfg(target_os = "linux")]
        3500000 => Some(libc::B3500000),
        #[cfg(target_os = "linux")]
        4000000 => Some(libc::B4000000),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_specification() {
        let config: LineConfig = "9600E2".parse().unwrap();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.stop_bits, StopBits::Two);
    }

    #[test]
    fn omitted_fields_default_independently() {
        let config: LineConfig = "9600".parse().unwrap();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);

        let config: LineConfig = "57600O".parse().unwrap();
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.parity, Parity::Odd);
        assert_eq!(config.stop_bits, StopBits::One);
    }

    #[test]
    fn empty_specification_is_the_default() {
        let config: LineConfig = "".parse().unwrap();
        assert_eq!(config, LineConfig::default());
        assert_eq!(config.baud_rate, 115200);
    }

    #[test]
    fn rejects_unknown_tokens() {
        for spec in ["9600X1", "9600N3", "abc", "N1", "9600N1Z", "99999999999N1"] {
            let result = spec.parse::<LineConfig>();
            assert!(
                matches!(result, Err(LinkError::BadLineSpec { .. })),
                "spec {spec:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_matches_specification_form() {
        assert_eq!(LineConfig::default().to_string(), "115200N1");
        let config: LineConfig = "9600E2".parse().unwrap();
        assert_eq!(config.to_string(), "9600E2");
    }

    #[cfg(unix)]
    mod termios {
        use super::*;
        use std::fs::File;
        use std::os::unix::io::{AsRawFd, FromRawFd};

        fn pty_pair() -> (File, File) {
            let mut master: libc::c_int = -1;
            let mut slave: libc::c_int = -1;
            // SAFETY: out-params are valid pointers; null termios and
            // winsize select the platform defaults.
            let rc = unsafe {
                libc::openpty(
                    &mut master,
                    &mut slave,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            };
            assert_eq!(rc, 0, "openpty failed");
            // SAFETY: openpty handed us ownership of both descriptors.
            unsafe { (File::from_raw_fd(master), File::from_raw_fd(slave)) }
        }

        #[test]
        fn applies_default_configuration_to_a_terminal() {
            let (master, _slave) = pty_pair();
            LineConfig::default().apply(master.as_raw_fd()).unwrap();
        }

        #[test]
        fn applies_parity_and_stop_bit_variants() {
            for spec in ["9600E2", "19200O1", "115200N2"] {
                let (master, _slave) = pty_pair();
                let config: LineConfig = spec.parse().unwrap();
                config.apply(master.as_raw_fd()).unwrap();
            }
        }

        #[test]
        fn rejects_rates_outside_the_table() {
            let (master, _slave) = pty_pair();
            let config = LineConfig {
                baud_rate: 12345,
                ..Default::default()
            };
            let result = config.apply(master.as_raw_fd());
            assert!(matches!(
                result,
                Err(LinkError::UnsupportedRate { rate: 12345 })
            ));
        }
    }
}
