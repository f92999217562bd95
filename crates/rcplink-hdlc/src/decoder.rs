//! Streaming frame decoder.

use bytes::{BufMut, BytesMut};

use crate::error::DecodeError;
use crate::{fcs, ESCAPE, ESCAPE_XOR, FCS_SIZE, FLAG, MAX_FRAME_SIZE};

/// Receives decoded frames and decode faults.
///
/// Callbacks fire synchronously from [`Decoder::feed`]. The slices
/// borrow the decoder's reassembly buffer and are valid only for the
/// duration of the call; copy them out to keep them.
pub trait FrameSink {
    /// A frame whose check sequence verified. `frame` is the payload
    /// with the check sequence already stripped.
    fn on_frame(&mut self, frame: &[u8]);

    /// A frame that failed validation, with whatever bytes had
    /// accumulated when the fault was detected.
    fn on_decode_error(&mut self, error: DecodeError, partial: &[u8]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Discarding bytes until the next boundary flag.
    NoSync,
    /// Accumulating frame bytes.
    Sync,
    /// The next byte is XOR-transformed before accumulation.
    Escaped,
}

/// Reassembles frames from an arbitrarily chunked byte stream.
///
/// Bytes ahead of the first flag are discarded, back-to-back flags are
/// treated as idle, and a frame that overruns the reassembly buffer
/// drops the stream back to the searching state until the next flag.
#[derive(Debug)]
pub struct Decoder {
    state: State,
    buf: BytesMut,
    fcs: u16,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            state: State::NoSync,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
            fcs: fcs::INIT,
        }
    }

    /// Drops any partial frame and waits for the next boundary flag.
    pub fn reset(&mut self) {
        self.state = State::NoSync;
        self.buf.clear();
        self.fcs = fcs::INIT;
    }

    /// Consumes one chunk of the byte stream, firing sink callbacks for
    /// every frame completed or faulted inside it.
    ///
    /// Chunk boundaries carry no meaning: any way of splitting a byte
    /// sequence across `feed` calls produces the same callback
    /// sequence. Feeding the decoder from inside a callback is rejected
    /// at compile time, as both the decoder and the sink are
    /// exclusively borrowed for the whole call.
    pub fn feed<S: FrameSink>(&mut self, bytes: &[u8], sink: &mut S) {
        for &byte in bytes {
            match self.state {
                State::NoSync => {
                    if byte == FLAG {
                        self.begin_frame();
                    }
                }
                State::Sync => match byte {
                    FLAG => self.end_frame(sink),
                    ESCAPE => self.state = State::Escaped,
                    _ => self.accumulate(byte, sink),
                },
                State::Escaped => {
                    // A flag after an escape is data like any other
                    // byte, not a frame boundary.
                    self.state = State::Sync;
                    self.accumulate(byte ^ ESCAPE_XOR, sink);
                }
            }
        }
    }

    fn begin_frame(&mut self) {
        self.state = State::Sync;
        self.buf.clear();
        self.fcs = fcs::INIT;
    }

    fn accumulate<S: FrameSink>(&mut self, byte: u8, sink: &mut S) {
        if self.buf.len() == MAX_FRAME_SIZE {
            sink.on_decode_error(DecodeError::Overflow, &self.buf);
            self.reset();
            return;
        }
        self.fcs = fcs::update(self.fcs, byte);
        self.buf.put_u8(byte);
    }

    fn end_frame<S: FrameSink>(&mut self, sink: &mut S) {
        // An empty buffer means idle or back-to-back flags.
        if self.buf.is_empty() {
            return;
        }
        if self.buf.len() < FCS_SIZE {
            sink.on_decode_error(DecodeError::TooShort, &self.buf);
        } else if self.fcs == fcs::GOOD {
            sink.on_frame(&self.buf[..self.buf.len() - FCS_SIZE]);
        } else {
            sink.on_decode_error(DecodeError::FcsMismatch, &self.buf);
        }
        // The closing flag doubles as the opening flag of the next
        // frame, so the decoder stays synchronized.
        self.buf.clear();
        self.fcs = fcs::INIT;
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_frame;
    use crate::frame::FrameBuffer;

    #[derive(Default)]
    struct TestSink {
        frames: Vec<Vec<u8>>,
        errors: Vec<(DecodeError, usize)>,
    }

    impl FrameSink for TestSink {
        fn on_frame(&mut self, frame: &[u8]) {
            self.frames.push(frame.to_vec());
        }

        fn on_decode_error(&mut self, error: DecodeError, partial: &[u8]) {
            self.errors.push((error, partial.len()));
        }
    }

    fn encoded(payload: &[u8]) -> Vec<u8> {
        let mut out = FrameBuffer::with_capacity(4 * MAX_FRAME_SIZE);
        encode_frame(payload, &mut out).unwrap();
        out.as_slice().to_vec()
    }

    #[test]
    fn decodes_golden_wire_frame() {
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&[0x7e, 0x01, 0xf1, 0xe1, 0x7e], &mut sink);
        assert_eq!(sink.frames, vec![vec![0x01]]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn any_split_yields_identical_frames() {
        let payload = b"\x7e\x7d\x11\x13\xf8 link bytes";
        let wire = encoded(payload);
        for split in 0..=wire.len() {
            let mut decoder = Decoder::new();
            let mut sink = TestSink::default();
            decoder.feed(&wire[..split], &mut sink);
            decoder.feed(&wire[split..], &mut sink);
            assert_eq!(sink.frames, vec![payload.to_vec()], "split at {split}");
            assert!(sink.errors.is_empty(), "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_feed() {
        let payload = b"spinel-ish payload \x7e\x7d";
        let wire = encoded(payload);
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        for &byte in &wire {
            decoder.feed(&[byte], &mut sink);
        }
        assert_eq!(sink.frames, vec![payload.to_vec()]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut wire = encoded(b"first");
        wire.extend_from_slice(&encoded(b"second"));
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&wire, &mut sink);
        assert_eq!(sink.frames, vec![b"first".to_vec(), b"second".to_vec()]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn closing_flag_opens_the_next_frame() {
        let mut wire = encoded(b"first");
        wire.extend_from_slice(&encoded(b"second")[1..]);
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&wire, &mut sink);
        assert_eq!(sink.frames, vec![b"first".to_vec(), b"second".to_vec()]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn idle_flags_are_not_errors() {
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&[0x7e; 8], &mut sink);
        assert!(sink.frames.is_empty());
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn noise_before_first_flag_is_discarded() {
        let mut wire = b"\x00\x01garbage".to_vec();
        wire.extend_from_slice(&encoded(b"ok"));
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&wire, &mut sink);
        assert_eq!(sink.frames, vec![b"ok".to_vec()]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn short_frame_reports_too_short_then_resyncs() {
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&[0x7e, 0x41, 0x7e], &mut sink);
        decoder.feed(&encoded(b"ok"), &mut sink);
        assert_eq!(sink.errors, vec![(DecodeError::TooShort, 1)]);
        assert_eq!(sink.frames, vec![b"ok".to_vec()]);
    }

    #[test]
    fn corrupt_byte_reports_fcs_mismatch_then_resyncs() {
        // Golden frame for [0x01] with the payload byte flipped.
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&[0x7e, 0x02, 0xf1, 0xe1, 0x7e], &mut sink);
        decoder.feed(&encoded(b"ok"), &mut sink);
        assert_eq!(sink.errors, vec![(DecodeError::FcsMismatch, 3)]);
        assert_eq!(sink.frames, vec![b"ok".to_vec()]);
    }

    #[test]
    fn empty_payload_roundtrip() {
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&encoded(&[]), &mut sink);
        assert_eq!(sink.frames, vec![Vec::<u8>::new()]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn largest_frame_roundtrip() {
        let payload = vec![0x41; MAX_FRAME_SIZE - FCS_SIZE];
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&encoded(&payload), &mut sink);
        assert_eq!(sink.frames, vec![payload]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn oversize_frame_overflows_then_resyncs() {
        let payload = vec![0x41; MAX_FRAME_SIZE - FCS_SIZE + 1];
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&encoded(&payload), &mut sink);
        decoder.feed(&encoded(b"ok"), &mut sink);
        assert_eq!(sink.errors, vec![(DecodeError::Overflow, MAX_FRAME_SIZE)]);
        assert_eq!(sink.frames, vec![b"ok".to_vec()]);
    }

    #[test]
    fn escaped_reserved_bytes_roundtrip() {
        let payload = [0x7e, 0x7d, 0x11, 0x13, 0xf8];
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&encoded(&payload), &mut sink);
        assert_eq!(sink.frames, vec![payload.to_vec()]);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut decoder = Decoder::new();
        let mut sink = TestSink::default();
        decoder.feed(&[0x7e, 0x41, 0x42], &mut sink);
        decoder.reset();
        decoder.feed(&encoded(b"ok"), &mut sink);
        assert_eq!(sink.frames, vec![b"ok".to_vec()]);
        assert!(sink.errors.is_empty());
    }
}
