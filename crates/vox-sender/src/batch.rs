use std::collections::BTreeMap;

use vox_codec::header::EDIT_HEADER_LEN;
use vox_core::types::{NodeId, PacketType};

use crate::error::SenderError;
use crate::packet::EditPacketBuffer;

/// A complete packet handed off for transmission to one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedPacket {
    pub node_id: NodeId,
    pub packet_type: PacketType,
    pub bytes: Vec<u8>,
}

/// One packet buffer per voxel server, filled by appending encoded edits.
#[derive(Debug)]
pub struct PendingEditPackets {
    buffers: BTreeMap<NodeId, EditPacketBuffer>,
    max_packet_size: usize,
}

impl PendingEditPackets {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            buffers: BTreeMap::new(),
            max_packet_size,
        }
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Largest encoded edit that fits a fresh packet.
    pub fn max_edit_len(&self) -> usize {
        self.max_packet_size.saturating_sub(EDIT_HEADER_LEN)
    }

    /// Appends `payload` to the buffer for `node_id`.
    ///
    /// Returns the packets that had to be released first: the previous
    /// content when the type changes, or when `payload` would overflow it.
    pub fn append(
        &mut self,
        node_id: NodeId,
        packet_type: PacketType,
        payload: &[u8],
    ) -> Result<Vec<ReleasedPacket>, SenderError> {
        if payload.len() > self.max_edit_len() {
            return Err(SenderError::OversizedEdit {
                len: payload.len(),
                max: self.max_edit_len(),
            });
        }

        let max_packet_size = self.max_packet_size;
        let buffer = self
            .buffers
            .entry(node_id)
            .or_insert_with(|| EditPacketBuffer::new(node_id, max_packet_size));

        let mut released = Vec::new();
        let type_changed = buffer.packet_type() != Some(packet_type);
        if (type_changed && !buffer.is_empty()) || !buffer.can_fit(payload.len()) {
            if let Some((ty, bytes)) = buffer.release() {
                released.push(ReleasedPacket {
                    node_id,
                    packet_type: ty,
                    bytes,
                });
            }
        }
        if buffer.packet_type() != Some(packet_type) {
            buffer.initialize(packet_type);
        }
        buffer.push(payload)?;
        Ok(released)
    }

    /// Releases one server's buffer if it holds anything.
    pub fn release(&mut self, node_id: NodeId) -> Option<ReleasedPacket> {
        let buffer = self.buffers.get_mut(&node_id)?;
        buffer.release().map(|(packet_type, bytes)| ReleasedPacket {
            node_id,
            packet_type,
            bytes,
        })
    }

    /// Releases every non-empty buffer in node id order.
    pub fn release_all(&mut self) -> Vec<ReleasedPacket> {
        self.buffers
            .iter_mut()
            .filter_map(|(node_id, buffer)| {
                buffer.release().map(|(packet_type, bytes)| ReleasedPacket {
                    node_id: *node_id,
                    packet_type,
                    bytes,
                })
            })
            .collect()
    }

    /// Used bytes of the buffer for `node_id`, header included.
    pub fn buffered_len(&self, node_id: NodeId) -> usize {
        self.buffers.get(&node_id).map_or(0, EditPacketBuffer::len)
    }

    /// Number of buffers currently holding unreleased content.
    pub fn pending_buffers(&self) -> usize {
        self.buffers.values().filter(|b| !b.is_empty()).count()
    }
}
