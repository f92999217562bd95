//! HDLC-framed byte-stream links to radio co-processors.
//!
//! rcplink speaks the HDLC-lite framing used between a host processor
//! and an RCP over a serial line, and drives that framing over real
//! UARTs or over pseudo-terminals wrapping an emulator subprocess.
//!
//! # Crate Structure
//!
//! - [`hdlc`] — HDLC-lite encoder, streaming decoder, and the FCS table
//! - [`link`] — Serial and pseudo-terminal link acquisition (POSIX)
//! - [`driver`] — Poll-driven engine tying a link to a frame sink

/// Re-export framing types.
pub mod hdlc {
    pub use rcplink_hdlc::*;
}

/// Re-export link acquisition types.
pub mod link {
    pub use rcplink_link::*;
}

/// Re-export driver types.
pub mod driver {
    pub use rcplink_driver::*;
}
