use crate::batch::PendingEditPackets;
use crate::bootstrap::PreServerQueue;
use crate::config::SenderConfig;
use crate::jurisdiction::JurisdictionMaps;

/// Counters describing what the sender did with producer input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Messages held because no voxel server was reachable.
    pub captured: u64,
    /// Held messages dropped to respect the pending bound.
    pub evicted: u64,
    /// Held messages replayed once servers appeared.
    pub replayed: u64,
    pub packets_released: u64,
    pub bytes_released: u64,
    /// Packets the sink refused.
    pub send_failures: u64,
    /// Edits refused by the batcher.
    pub dropped_edits: u64,
    /// Edit details that could not be encoded.
    pub encode_failures: u64,
}

/// Mutable sender state guarded by one lock.
#[derive(Debug)]
pub struct SenderState {
    pub config: SenderConfig,
    pub pending: PendingEditPackets,
    pub pre_server: PreServerQueue,
    pub jurisdictions: Option<JurisdictionMaps>,
    pub stats: SenderStats,
    /// Sequence for complete edit messages built outside the batcher.
    pub single_sequence: u16,
}

impl SenderState {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            pending: PendingEditPackets::new(config.max_packet_size),
            pre_server: PreServerQueue::new(),
            jurisdictions: None,
            stats: SenderStats::default(),
            single_sequence: 0,
            config,
        }
    }

    pub fn next_single_sequence(&mut self) -> u16 {
        let sequence = self.single_sequence;
        self.single_sequence = self.single_sequence.wrapping_add(1);
        sequence
    }
}
