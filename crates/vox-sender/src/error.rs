use thiserror::Error;
use vox_codec::error::CodecError;

#[derive(Debug, Error)]
pub enum SenderError {
    /// A single encoded edit can never fit one packet.
    #[error("edit of {len} bytes exceeds per-packet payload limit {max}")]
    OversizedEdit { len: usize, max: usize },
    /// Append refused because the buffer is full or not initialized.
    #[error("packet buffer overflow: {used} used + {len} > {max}")]
    PacketOverflow { used: usize, len: usize, max: usize },
    #[error("invalid sender config: {0}")]
    InvalidConfig(&'static str),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("jurisdiction file error: {0}")]
    Jurisdiction(#[from] toml::de::Error),
}
