use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoxError {
    /// Invalid caller input or malformed primitive value.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Octal code is shorter than its declared section count requires.
    #[error("truncated octal code: need {needed} bytes, have {available}")]
    TruncatedOctalCode { needed: usize, available: usize },
    /// Unknown packet type byte.
    #[error("unknown packet type: {0:#04x}")]
    UnknownPacketType(u8),
}

#[cfg(test)]
mod tests {
    use super::VoxError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            VoxError::InvalidInput("bad size").to_string(),
            "invalid input: bad size"
        );
        assert_eq!(
            VoxError::TruncatedOctalCode {
                needed: 3,
                available: 1
            }
            .to_string(),
            "truncated octal code: need 3 bytes, have 1"
        );
        assert_eq!(
            VoxError::UnknownPacketType(0x7a).to_string(),
            "unknown packet type: 0x7a"
        );
    }
}
