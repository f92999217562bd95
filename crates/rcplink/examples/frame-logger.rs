//! Frame logger — opens a link target and prints every decoded frame.
//!
//! Run with:
//!   cargo run --example frame-logger -- /bin/cat
//!
//! Point it at a serial device to watch live RCP traffic:
//!   cargo run --example frame-logger -- /dev/ttyUSB0 115200N1

use std::time::Duration;

use rcplink::driver::LinkDriver;
use rcplink::hdlc::{DecodeError, FrameSink};

struct Logger;

impl FrameSink for Logger {
    fn on_frame(&mut self, frame: &[u8]) {
        let hex: String = frame.iter().map(|b| format!("{b:02x}")).collect();
        println!("frame {} bytes: {hex}", frame.len());
    }

    fn on_decode_error(&mut self, error: DecodeError, partial: &[u8]) {
        eprintln!("decode error: {error} ({} bytes dropped)", partial.len());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "/bin/cat".to_string());
    let line = args.next().unwrap_or_default();

    let mut driver = LinkDriver::new(Logger);
    driver.open(&target, &line)?;
    eprintln!("link open ({})", driver.link_kind().unwrap_or("unknown"));

    // Give an echoing target something to reflect.
    driver.send_frame(b"hello over hdlc")?;

    loop {
        if driver.wait_readable(Duration::from_millis(250))? {
            driver.pump_read()?;
        }
    }
}
