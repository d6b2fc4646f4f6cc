use thiserror::Error;
use vox_core::error::VoxError;

/// Errors returned by header/edit codec operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Primitive validation failure (octal code, packet type).
    #[error(transparent)]
    Core(#[from] VoxError),
    /// Encoded output would not fit the allowed length.
    #[error("encoded length {len} exceeds limit {max}")]
    TooLarge { len: usize, max: usize },
    /// Packet-level structural failure.
    #[error("invalid packet: {0}")]
    InvalidPacket(&'static str),
}
