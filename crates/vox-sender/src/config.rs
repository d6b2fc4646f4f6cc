use serde::{Deserialize, Serialize};
use vox_codec::header::EDIT_HEADER_LEN;
use vox_core::types::MAX_PACKET_SIZE;

use crate::error::SenderError;

/// Pre-server messages kept by default while no voxel server is known.
pub const DEFAULT_MAX_PENDING_MESSAGES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Upper bound on every released packet, header included.
    pub max_packet_size: usize,
    /// Combined cap on single and batchable messages held before any server
    /// is known. Zero disables pre-server buffering.
    pub max_pending_messages: usize,
    /// Global kill switch; when false every producer call is a no-op.
    pub sending_enabled: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_packet_size: MAX_PACKET_SIZE,
            max_pending_messages: DEFAULT_MAX_PENDING_MESSAGES,
            sending_enabled: true,
        }
    }
}

impl SenderConfig {
    /// Largest single encoded edit the batcher accepts.
    pub fn max_edit_len(&self) -> usize {
        self.max_packet_size.saturating_sub(EDIT_HEADER_LEN)
    }

    pub fn validate(&self) -> Result<(), SenderError> {
        if self.max_packet_size <= EDIT_HEADER_LEN {
            return Err(SenderError::InvalidConfig(
                "max_packet_size must exceed the edit header",
            ));
        }
        if self.max_packet_size > MAX_PACKET_SIZE {
            return Err(SenderError::InvalidConfig(
                "max_packet_size above transport maximum",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SenderConfig, DEFAULT_MAX_PENDING_MESSAGES};
    use vox_core::types::MAX_PACKET_SIZE;

    #[test]
    fn defaults_match_transport_limits() {
        let cfg = SenderConfig::default();
        assert_eq!(cfg.max_packet_size, MAX_PACKET_SIZE);
        assert_eq!(cfg.max_pending_messages, DEFAULT_MAX_PENDING_MESSAGES);
        assert!(cfg.sending_enabled);
        assert_eq!(cfg.max_edit_len(), MAX_PACKET_SIZE - 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unusable_packet_sizes() {
        let tiny = SenderConfig {
            max_packet_size: 4,
            ..SenderConfig::default()
        };
        assert!(tiny.validate().is_err());

        let huge = SenderConfig {
            max_packet_size: MAX_PACKET_SIZE + 1,
            ..SenderConfig::default()
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: SenderConfig = toml::from_str("max_pending_messages = 3").expect("valid toml");
        assert_eq!(cfg.max_pending_messages, 3);
        assert_eq!(cfg.max_packet_size, MAX_PACKET_SIZE);
        assert!(cfg.sending_enabled);
    }
}
