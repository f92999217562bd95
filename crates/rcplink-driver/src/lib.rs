//! Poll-driven HDLC link engine.
//!
//! [`LinkDriver`] ties the pieces together: it owns the open
//! [`rcplink_link::LinkStream`], pumps received bytes through the
//! streaming decoder, and writes encoded frames out with
//! back-pressure handling. It is a reactive component with no threads
//! and no event loop of its own; the embedding application drives it.

pub mod driver;
pub mod error;

pub use driver::LinkDriver;
pub use error::{DriverError, Result};
