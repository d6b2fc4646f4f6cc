use vox_codec::header::write_edit_header;
use vox_core::types::{NodeId, PacketType};

use crate::error::SenderError;

/// One in-flight, not yet released packet for a single voxel server.
///
/// Holds no bytes and no type until initialized; `release` returns it to that
/// state. Used length never exceeds `max_size`.
#[derive(Debug, Clone)]
pub struct EditPacketBuffer {
    node_id: NodeId,
    packet_type: Option<PacketType>,
    bytes: Vec<u8>,
    max_size: usize,
    next_sequence: u16,
}

impl EditPacketBuffer {
    pub fn new(node_id: NodeId, max_size: usize) -> Self {
        Self {
            node_id,
            packet_type: None,
            bytes: Vec::with_capacity(max_size),
            max_size,
            next_sequence: 0,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn packet_type(&self) -> Option<PacketType> {
        self.packet_type
    }

    /// Used bytes, header included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn can_fit(&self, len: usize) -> bool {
        self.bytes.len() + len <= self.max_size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Discards any content and writes a fresh header for `packet_type`.
    pub fn initialize(&mut self, packet_type: PacketType) {
        self.bytes.clear();
        write_edit_header(&mut self.bytes, packet_type, self.next_sequence);
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.packet_type = Some(packet_type);
    }

    /// Appends an encoded edit; refuses rather than overruns.
    pub fn push(&mut self, payload: &[u8]) -> Result<(), SenderError> {
        if self.packet_type.is_none() || !self.can_fit(payload.len()) {
            return Err(SenderError::PacketOverflow {
                used: self.bytes.len(),
                len: payload.len(),
                max: self.max_size,
            });
        }
        self.bytes.extend_from_slice(payload);
        Ok(())
    }

    /// Takes the packet out, leaving the buffer empty and unset.
    pub fn release(&mut self) -> Option<(PacketType, Vec<u8>)> {
        let packet_type = self.packet_type.take()?;
        if self.bytes.is_empty() {
            return None;
        }
        let bytes = std::mem::replace(&mut self.bytes, Vec::with_capacity(self.max_size));
        Some((packet_type, bytes))
    }
}
