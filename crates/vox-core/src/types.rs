use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VoxError;

/// Largest packet the client will ever hand to a transport, in bytes.
pub const MAX_PACKET_SIZE: usize = 1500;

/// Opaque identifier of a node in the node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u16);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Role a node plays in the domain. Only voxel servers receive edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    VoxelServer,
    AudioMixer,
    AvatarMixer,
    Agent,
}

/// Edit message type carried in the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PacketType {
    SetVoxel = b'S',
    SetVoxelDestructive = b'O',
    EraseVoxel = b'E',
}

impl PacketType {
    /// Wire byte for this type.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Protocol version written after the type byte.
    pub fn version(self) -> u8 {
        match self {
            PacketType::SetVoxel | PacketType::SetVoxelDestructive => 1,
            PacketType::EraseVoxel => 0,
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = VoxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'S' => Ok(PacketType::SetVoxel),
            b'O' => Ok(PacketType::SetVoxelDestructive),
            b'E' => Ok(PacketType::EraseVoxel),
            other => Err(VoxError::UnknownPacketType(other)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketType::SetVoxel => "set_voxel",
            PacketType::SetVoxelDestructive => "set_voxel_destructive",
            PacketType::EraseVoxel => "erase_voxel",
        };
        f.write_str(name)
    }
}
