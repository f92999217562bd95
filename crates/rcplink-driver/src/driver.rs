//! The poll-driven link engine.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use rcplink_hdlc::{encode_frame, DecodeError, Decoder, FrameBuffer, FrameSink, MAX_FRAME_SIZE};
use rcplink_link::LinkStream;

use crate::error::{DriverError, Result};

/// The link engine: owns the link, the reassembly state, and the
/// caller's frame sink.
///
/// The engine is reactive. It creates no threads and never blocks
/// waiting for data; the embedding application learns about readiness
/// (from [`LinkDriver::wait_readable`] or its own poller) and calls
/// [`LinkDriver::pump_read`], and decoded frames come back
/// synchronously through the sink supplied at construction.
pub struct LinkDriver<S> {
    link: Option<LinkStream>,
    decoder: Decoder,
    sink: S,
}

impl<S: FrameSink> LinkDriver<S> {
    /// Creates a closed engine around the caller's sink.
    pub fn new(sink: S) -> Self {
        Self {
            link: None,
            decoder: Decoder::new(),
            sink,
        }
    }

    /// Opens the link target (see [`LinkStream::open`] for how `path`
    /// and `config` are interpreted). Exactly one link can be up at a
    /// time.
    pub fn open(&mut self, path: impl AsRef<Path>, config: &str) -> Result<()> {
        if self.link.is_some() {
            return Err(DriverError::AlreadyOpen);
        }
        let link = LinkStream::open(path, config)?;
        info!(kind = link.kind(), "link driver opened");
        self.decoder.reset();
        self.link = Some(link);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Tears the link down; for subprocess links this also reaps the
    /// child.
    ///
    /// # Panics
    ///
    /// Panics when no link is open. Closing an engine that was never
    /// opened is a bug in the embedding application.
    pub fn close(&mut self) -> Result<()> {
        match self.link.take() {
            Some(link) => {
                link.close()?;
                info!("link driver closed");
                Ok(())
            }
            None => panic!("close called with no open link"),
        }
    }

    /// One non-blocking drain step: reads whatever the descriptor has
    /// buffered, up to one reassembly buffer's worth, and runs it
    /// through the decoder. An empty kernel buffer and end of stream
    /// are quiescence, not errors.
    ///
    /// Returns the number of raw bytes drained. Zero right after a
    /// positive [`LinkDriver::wait_readable`] means the peer hung up.
    /// A [`DriverError::Read`] means the channel itself failed; this
    /// engine never terminates the process on its own.
    pub fn pump_read(&mut self) -> Result<usize> {
        let link = self.link.as_mut().ok_or(DriverError::NotOpen)?;
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let n = read_available(link, &mut buf).map_err(|source| DriverError::Read { source })?;
        if n > 0 {
            debug!(len = n, "pumped link bytes");
            let mut sink = WarnOnError(&mut self.sink);
            self.decoder.feed(&buf[..n], &mut sink);
        }
        Ok(n)
    }

    /// Encodes `payload` into a fresh frame buffer and writes the
    /// complete frame out, retrying transient back-pressure. On any
    /// failure the frame was not delivered and nothing partial reached
    /// the wire.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        let link = self.link.as_mut().ok_or(DriverError::NotOpen)?;
        let mut out = FrameBuffer::new();
        encode_frame(payload, &mut out)?;
        write_all_retrying(link, out.as_slice())
            .map_err(|source| DriverError::Write { source })?;
        debug!(len = payload.len(), "sent frame");
        Ok(())
    }

    /// Waits until the link is readable, hung up, or the timeout
    /// passes. Returns whether [`LinkDriver::pump_read`] is worth
    /// calling now.
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        let link = self.link.as_ref().ok_or(DriverError::NotOpen)?;
        link.wait_readable(timeout)
            .map_err(|source| DriverError::Read { source })
    }

    /// Transport name of the open link, for diagnostics.
    pub fn link_kind(&self) -> Option<&'static str> {
        self.link.as_ref().map(LinkStream::kind)
    }

    /// Process id of the subprocess behind a pseudo-terminal link.
    pub fn child_id(&self) -> Option<u32> {
        self.link.as_ref().and_then(LinkStream::child_id)
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the engine and return the sink. An open link is torn
    /// down on drop.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S> std::fmt::Debug for LinkDriver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkDriver")
            .field("open", &self.link.is_some())
            .finish()
    }
}

/// Logs decode faults at the link boundary before handing them to the
/// caller's sink.
struct WarnOnError<'a, S>(&'a mut S);

impl<S: FrameSink> FrameSink for WarnOnError<'_, S> {
    fn on_frame(&mut self, frame: &[u8]) {
        self.0.on_frame(frame);
    }

    fn on_decode_error(&mut self, error: DecodeError, partial: &[u8]) {
        warn!(%error, discarded = partial.len(), "error decoding incoming frame");
        self.0.on_decode_error(error, partial);
    }
}

/// One read against a non-blocking descriptor. An empty kernel buffer
/// reads as zero bytes; interrupted reads are retried.
fn read_available<T: Read>(stream: &mut T, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
            Err(err) => return Err(err),
        }
    }
}

/// Writes the whole buffer, retrying interrupts and back-pressure. A
/// write of zero means the peer is gone.
fn write_all_retrying<T: Write>(stream: &mut T, bytes: &[u8]) -> std::io::Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match stream.write(&bytes[offset..]) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
