//! One-shot frame encoder.

use crate::error::{EncodeError, Result};
use crate::frame::FrameBuffer;
use crate::{fcs, ESCAPE, ESCAPE_XOR, FLAG, SPECIAL, XOFF, XON};

/// Running state for a frame being encoded.
///
/// A frame is produced by one `begin`, any number of `encode` calls,
/// and one `finalize`. Every emitted byte goes through the escaping
/// rule, the check sequence included.
#[derive(Debug)]
pub struct Encoder {
    fcs: u16,
}

impl Encoder {
    pub fn new() -> Self {
        Self { fcs: fcs::INIT }
    }

    /// Opens the frame: emits the boundary flag and resets the check
    /// sequence accumulator.
    pub fn begin(&mut self, out: &mut FrameBuffer) -> Result<()> {
        self.fcs = fcs::INIT;
        out.push(FLAG)
    }

    /// Escapes and appends payload bytes, folding each into the check
    /// sequence.
    pub fn encode(&mut self, out: &mut FrameBuffer, payload: &[u8]) -> Result<()> {
        for &byte in payload {
            self.fcs = fcs::update(self.fcs, byte);
            push_escaped(out, byte)?;
        }
        Ok(())
    }

    /// Appends the complemented check sequence, least significant byte
    /// first and escaped like any payload byte, then the closing flag.
    pub fn finalize(&mut self, out: &mut FrameBuffer) -> Result<()> {
        let fcs = !self.fcs;
        push_escaped(out, (fcs & 0xff) as u8)?;
        push_escaped(out, (fcs >> 8) as u8)?;
        out.push(FLAG)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes one complete frame into `out`.
pub fn encode_frame(payload: &[u8], out: &mut FrameBuffer) -> Result<()> {
    let mut encoder = Encoder::new();
    encoder.begin(out)?;
    encoder.encode(out, payload)?;
    encoder.finalize(out)
}

fn needs_escape(byte: u8) -> bool {
    matches!(byte, FLAG | ESCAPE | XON | XOFF | SPECIAL)
}

/// Appends one byte through the escaping rule. An escaped pair is
/// written atomically: either both bytes fit or neither is written.
fn push_escaped(out: &mut FrameBuffer, byte: u8) -> Result<()> {
    if needs_escape(byte) {
        if out.remaining() < 2 {
            return Err(EncodeError::Overflow {
                capacity: out.capacity(),
            });
        }
        out.push(ESCAPE)?;
        out.push(byte ^ ESCAPE_XOR)
    } else {
        out.push(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(payload: &[u8]) -> Vec<u8> {
        let mut out = FrameBuffer::new();
        encode_frame(payload, &mut out).unwrap();
        out.as_slice().to_vec()
    }

    #[test]
    fn golden_single_byte_frame() {
        assert_eq!(encoded(&[0x01]), [0x7e, 0x01, 0xf1, 0xe1, 0x7e]);
    }

    #[test]
    fn empty_payload_frame() {
        // Check sequence of the empty message is !0xffff == 0x0000.
        assert_eq!(encoded(&[]), [0x7e, 0x00, 0x00, 0x7e]);
    }

    #[test]
    fn reserved_bytes_are_escaped() {
        for byte in [FLAG, ESCAPE, XON, XOFF, SPECIAL] {
            let wire = encoded(&[byte]);
            assert_eq!(wire[0], FLAG);
            assert_eq!(wire[1], ESCAPE);
            assert_eq!(wire[2], byte ^ ESCAPE_XOR);
            assert_eq!(*wire.last().unwrap(), FLAG);
        }
    }

    #[test]
    fn plain_bytes_pass_through() {
        let wire = encoded(b"ab");
        assert_eq!(&wire[..3], &[0x7e, b'a', b'b']);
    }

    #[test]
    fn overflow_when_buffer_too_small() {
        let mut out = FrameBuffer::with_capacity(4);
        let err = encode_frame(&[0x01, 0x02], &mut out).unwrap_err();
        assert_eq!(err, EncodeError::Overflow { capacity: 4 });
    }

    #[test]
    fn escaped_pair_never_split_at_capacity_edge() {
        // Room for the opening flag and one more byte, but the payload
        // byte needs an escaped pair.
        let mut out = FrameBuffer::with_capacity(2);
        let mut encoder = Encoder::new();
        encoder.begin(&mut out).unwrap();
        let before = out.len();
        assert!(encoder.encode(&mut out, &[FLAG]).is_err());
        assert_eq!(out.len(), before);
    }

    #[test]
    fn multi_call_encode_matches_single_call() {
        let mut split = FrameBuffer::new();
        let mut encoder = Encoder::new();
        encoder.begin(&mut split).unwrap();
        encoder.encode(&mut split, b"he").unwrap();
        encoder.encode(&mut split, b"llo").unwrap();
        encoder.finalize(&mut split).unwrap();
        assert_eq!(split.as_slice(), encoded(b"hello").as_slice());
    }
}
