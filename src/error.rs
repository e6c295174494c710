use thiserror::Error;

use crate::webrtc::transport::TransportError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Failure reported by the underlying peer transport. Carried verbatim;
    /// the core never swallows these.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A stream selector did not resolve to any variant in the pool.
    #[error("stream not found")]
    StreamNotFound,

    /// A data-channel frame payload does not fit the 16-bit length field.
    #[error("payload too large for data channel frame: {0} bytes")]
    PayloadTooLarge(usize),
}

impl AppError {
    /// True for the benign "already at the floor/ceiling" outcome of a
    /// relative stream selector.
    pub fn is_stream_not_found(&self) -> bool {
        matches!(self, AppError::StreamNotFound)
    }
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, AppError>;
