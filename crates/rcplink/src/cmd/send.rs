use std::time::{Duration, Instant};

use rcplink_driver::LinkDriver;
use rcplink_hdlc::{DecodeError, FrameSink};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{driver_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_frame, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct ResponseSink {
    frames: Vec<Vec<u8>>,
}

impl FrameSink for ResponseSink {
    fn on_frame(&mut self, frame: &[u8]) {
        self.frames.push(frame.to_vec());
    }

    fn on_decode_error(&mut self, _error: DecodeError, _partial: &[u8]) {}
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let mut driver = LinkDriver::new(ResponseSink::default());
    driver
        .open(&args.target, &args.line)
        .map_err(|err| driver_error("open failed", err))?;
    driver
        .send_frame(&payload)
        .map_err(|err| driver_error("send failed", err))?;

    if args.wait {
        let frame = wait_for_response(&mut driver, wait_timeout)?;
        print_frame(1, &frame, format);
    }

    driver
        .close()
        .map_err(|err| driver_error("close failed", err))?;
    Ok(SUCCESS)
}

fn wait_for_response(
    driver: &mut LinkDriver<ResponseSink>,
    timeout: Duration,
) -> CliResult<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut idle_reads = 0u32;

    while driver.sink().frames.is_empty() {
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                "timed out waiting for a response frame",
            ));
        }

        let readable = driver
            .wait_readable(POLL_INTERVAL)
            .map_err(|err| driver_error("poll failed", err))?;
        if !readable {
            idle_reads = 0;
            continue;
        }

        let drained = driver
            .pump_read()
            .map_err(|err| driver_error("read failed", err))?;
        if drained == 0 {
            idle_reads += 1;
            if idle_reads >= 2 {
                return Err(CliError::new(
                    FAILURE,
                    "link closed before a response arrived",
                ));
            }
        } else {
            idle_reads = 0;
        }
    }

    Ok(driver.sink_mut().frames.remove(0))
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex).map_err(|detail| CliError::new(USAGE, format!("--hex {detail}")));
    }
    if let Some(text) = &args.text {
        return Ok(text.as_bytes().to_vec());
    }
    Ok(Vec::new())
}

fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let mut digits = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':');
    let mut bytes = Vec::new();

    while let Some(high) = digits.next() {
        let low = digits
            .next()
            .ok_or_else(|| "has an odd number of digits".to_string())?;
        let high = high
            .to_digit(16)
            .ok_or_else(|| format!("contains a non-hex character {high:?}"))?;
        let low = low
            .to_digit(16)
            .ok_or_else(|| format!("contains a non-hex character {low:?}"))?;
        bytes.push((high << 4 | low) as u8);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_hex_accepts_separators() {
        assert_eq!(parse_hex("810200").unwrap(), vec![0x81, 0x02, 0x00]);
        assert_eq!(parse_hex("81 02:00").unwrap(), vec![0x81, 0x02, 0x00]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert!(parse_hex("123").unwrap_err().contains("odd number"));
        assert!(parse_hex("8g").unwrap_err().contains("non-hex"));
    }

    #[test]
    fn payload_defaults_to_empty() {
        let args = SendArgs {
            target: PathBuf::from("/dev/null"),
            line: String::new(),
            hex: None,
            text: None,
            wait: false,
            wait_timeout: "5s".to_string(),
        };
        assert!(resolve_payload(&args).unwrap().is_empty());
    }

    #[test]
    fn text_payload_passes_through() {
        let args = SendArgs {
            target: PathBuf::from("/dev/null"),
            line: String::new(),
            hex: None,
            text: Some("reset".to_string()),
            wait: false,
            wait_timeout: "5s".to_string(),
        };
        assert_eq!(resolve_payload(&args).unwrap(), b"reset");
    }
}
