use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rcplink_driver::LinkDriver;
use rcplink_hdlc::{DecodeError, FrameSink};

use crate::cmd::{parse_duration, DumpArgs};
use crate::exit::{driver_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_frame, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct PrintSink {
    format: OutputFormat,
    printed: usize,
    faults: usize,
}

impl FrameSink for PrintSink {
    fn on_frame(&mut self, frame: &[u8]) {
        self.printed += 1;
        print_frame(self.printed, frame, self.format);
    }

    fn on_decode_error(&mut self, _error: DecodeError, _partial: &[u8]) {
        // The driver already logged the fault; just keep score.
        self.faults += 1;
    }
}

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = match &args.timeout {
        Some(spec) => Some(Instant::now() + parse_duration(spec)?),
        None => None,
    };

    let mut driver = LinkDriver::new(PrintSink {
        format,
        printed: 0,
        faults: 0,
    });
    driver
        .open(&args.target, &args.line)
        .map_err(|err| driver_error("open failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut hangup = false;
    let mut idle_reads = 0u32;

    while running.load(Ordering::SeqCst) {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        if let Some(count) = args.count {
            if driver.sink().printed >= count {
                break;
            }
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
            // Readable but empty is a hangup; two in a row rides out a
            // stray wakeup.
            idle_reads += 1;
            if idle_reads >= 2 {
                hangup = true;
                break;
            }
        } else {
            idle_reads = 0;
        }
    }

    let printed = driver.sink().printed;
    let faults = driver.sink().faults;
    driver
        .close()
        .map_err(|err| driver_error("close failed", err))?;
    if faults > 0 {
        eprintln!("{faults} undecodable byte runs discarded");
    }

    if hangup {
        if let Some(count) = args.count {
            if printed < count {
                return Err(CliError::new(
                    FAILURE,
                    format!("link closed after {printed} of {count} frames"),
                ));
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
