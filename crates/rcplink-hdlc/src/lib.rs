//! HDLC-lite framing for host-to-RCP byte streams.
//!
//! Frames are delimited by `0x7e` flag bytes, transparency comes from
//! `0x7d` escaping, and integrity from a 16-bit frame check sequence
//! (RFC 1662) appended to every frame. The decoder is a push-style
//! state machine that tolerates inter-frame noise and arbitrary chunk
//! boundaries; the encoder writes complete frames into fixed-capacity
//! buffers so a failed encode never reaches the wire.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod fcs;
pub mod frame;

/// Frame boundary marker.
pub const FLAG: u8 = 0x7e;
/// Escape introducer; the byte that follows is XOR-transformed.
pub const ESCAPE: u8 = 0x7d;
/// Transform applied to the byte following [`ESCAPE`].
pub const ESCAPE_XOR: u8 = 0x20;
/// Software flow-control resume byte, escaped on transmit.
pub const XON: u8 = 0x11;
/// Software flow-control pause byte, escaped on transmit.
pub const XOFF: u8 = 0x13;
/// Vendor-reserved byte, escaped on transmit.
pub const SPECIAL: u8 = 0xf8;
/// Size of the frame check sequence in bytes.
pub const FCS_SIZE: usize = 2;
/// Capacity of the reassembly buffer and the default encode buffer.
pub const MAX_FRAME_SIZE: usize = 1300;

pub use decoder::{Decoder, FrameSink};
pub use encoder::{encode_frame, Encoder};
pub use error::{DecodeError, EncodeError, Result};
pub use frame::FrameBuffer;
