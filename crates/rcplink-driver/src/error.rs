/// Errors that can occur while driving a link.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A link is already open on this engine.
    #[error("link already open")]
    AlreadyOpen,

    /// The engine has no open link.
    #[error("link not open")]
    NotOpen,

    /// Acquiring or tearing down the link failed.
    #[error("link error: {0}")]
    Link(#[from] rcplink_link::LinkError),

    /// The outbound frame could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] rcplink_hdlc::EncodeError),

    /// The receive path failed. The channel is unusable; the embedding
    /// application decides whether to tear down or restart.
    #[error("link read failed: {source}")]
    Read { source: std::io::Error },

    /// The transmit path failed. The frame was not delivered, but the
    /// link may still be usable.
    #[error("link write failed: {source}")]
    Write { source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, DriverError>;
