use std::collections::VecDeque;

use tracing::{debug, warn};
use vox_core::types::{NodeId, PacketType};

use crate::batch::{PendingEditPackets, ReleasedPacket};
use crate::router::NodeTarget;

/// A producer call captured while no voxel server was reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreServerEntry {
    pub packet_type: PacketType,
    /// Where a single goes on replay. Batchable edits always carry
    /// [`NodeTarget::Owners`] and are re-routed through the batcher.
    pub target: NodeTarget,
    pub bytes: Vec<u8>,
    /// Capture order across both collections; lower is older.
    pub age: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Complete packet sent as-is on replay.
    Single,
    /// Encoded edit replayed through the batcher.
    Batchable,
}

/// Everything a drain produced, in the order it must reach the sink.
#[derive(Debug, Default)]
pub struct PreServerReplay {
    /// Complete packets to send directly to their targets.
    pub singles: Vec<PreServerEntry>,
    /// Packets released while replaying batchable edits, plus the final
    /// release when one was requested during bootstrap.
    pub released: Vec<ReleasedPacket>,
    /// Batchable edits the batcher accepted for at least one server.
    pub replayed: usize,
    /// Batchable edits no server owns, plus per-server batcher refusals.
    pub dropped: usize,
}

/// Bounded holding area for messages produced before discovery.
#[derive(Debug, Default)]
pub struct PreServerQueue {
    singles: VecDeque<PreServerEntry>,
    batchable: VecDeque<PreServerEntry>,
    next_age: u64,
    release_pending: bool,
}

impl PreServerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.singles.len() + self.batchable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.batchable.is_empty()
    }

    pub fn singles(&self) -> impl Iterator<Item = &PreServerEntry> {
        self.singles.iter()
    }

    pub fn batchable(&self) -> impl Iterator<Item = &PreServerEntry> {
        self.batchable.iter()
    }

    /// Remembers that a flush was asked for before any server existed.
    pub fn request_release(&mut self) {
        self.release_pending = true;
    }

    pub fn release_pending(&self) -> bool {
        self.release_pending
    }

    /// Stores one message and enforces `max_pending` across both kinds.
    ///
    /// Returns the entry that was dropped to stay within the bound, if any.
    pub fn capture(
        &mut self,
        kind: EntryKind,
        packet_type: PacketType,
        target: NodeTarget,
        bytes: Vec<u8>,
        max_pending: usize,
    ) -> Option<PreServerEntry> {
        let entry = PreServerEntry {
            packet_type,
            target,
            bytes,
            age: self.next_age,
        };
        self.next_age += 1;

        if max_pending == 0 {
            warn!(?kind, "pre-server buffering disabled; dropping message");
            return Some(entry);
        }

        match kind {
            EntryKind::Single => self.singles.push_back(entry),
            EntryKind::Batchable => self.batchable.push_back(entry),
        }

        let mut evicted = self.trim_to(max_pending);
        evicted.pop()
    }

    /// Evicts oldest entries until at most `max_pending` remain.
    pub fn trim_to(&mut self, max_pending: usize) -> Vec<PreServerEntry> {
        let mut evicted = Vec::new();
        while self.len() > max_pending {
            let Some(entry) = self.pop_oldest() else {
                break;
            };
            warn!(
                age = entry.age,
                packet_type = %entry.packet_type,
                max_pending,
                "pre-server queue full; evicting oldest message"
            );
            evicted.push(entry);
        }
        evicted
    }

    fn pop_oldest(&mut self) -> Option<PreServerEntry> {
        let single_age = self.singles.front().map(|e| e.age);
        let batch_age = self.batchable.front().map(|e| e.age);
        match (single_age, batch_age) {
            (Some(s), Some(b)) if b < s => self.batchable.pop_front(),
            (Some(_), _) => self.singles.pop_front(),
            (None, Some(_)) => self.batchable.pop_front(),
            (None, None) => None,
        }
    }

    /// Replays every captured message and empties the queue.
    ///
    /// Singles come back untouched for direct sending. Batchable edits go
    /// through `batcher` to the servers `route` picks, in capture order.
    pub fn drain_into<F>(&mut self, batcher: &mut PendingEditPackets, mut route: F) -> PreServerReplay
    where
        F: FnMut(&[u8]) -> Vec<NodeId>,
    {
        let mut replay = PreServerReplay {
            singles: self.singles.drain(..).collect(),
            ..PreServerReplay::default()
        };

        for entry in self.batchable.drain(..) {
            let node_ids = route(&entry.bytes);
            if node_ids.is_empty() {
                debug!(age = entry.age, "no server owns replayed edit; dropping");
                replay.dropped += 1;
                continue;
            }
            let mut accepted = false;
            for node_id in node_ids {
                match batcher.append(node_id, entry.packet_type, &entry.bytes) {
                    Ok(released) => {
                        accepted = true;
                        replay.released.extend(released);
                    }
                    Err(err) => {
                        warn!(%node_id, error = %err, "dropping replayed edit");
                        replay.dropped += 1;
                    }
                }
            }
            if accepted {
                replay.replayed += 1;
            }
        }

        if std::mem::take(&mut self.release_pending) {
            replay.released.extend(batcher.release_all());
        }

        debug!(
            singles = replay.singles.len(),
            released = replay.released.len(),
            "pre-server queue drained"
        );
        replay
    }
}
