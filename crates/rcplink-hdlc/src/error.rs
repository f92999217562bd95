use thiserror::Error;

/// Errors raised while building an encoded frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The encoded frame would not fit the output buffer.
    ///
    /// Nothing from the failed write is visible in the buffer; callers
    /// encode into a fresh buffer per frame and discard it on error.
    #[error("encoded frame exceeds the {capacity}-byte output buffer")]
    Overflow { capacity: usize },
}

/// Faults detected by the streaming decoder, delivered through
/// `FrameSink::on_decode_error` together with the bytes accumulated so
/// far.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The closing flag arrived before a complete check sequence.
    #[error("frame shorter than its check sequence")]
    TooShort,
    /// The running check sequence residue did not match.
    #[error("frame check sequence mismatch")]
    FcsMismatch,
    /// The frame outgrew the reassembly buffer.
    #[error("frame exceeds the reassembly buffer")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, EncodeError>;
