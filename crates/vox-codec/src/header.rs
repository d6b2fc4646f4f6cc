use vox_core::types::PacketType;

use crate::error::CodecError;

/// Bytes written by [`populate_type_and_version`].
pub const TYPE_AND_VERSION_LEN: usize = 2;
/// Full edit packet header: type, version, little-endian sequence.
pub const EDIT_HEADER_LEN: usize = TYPE_AND_VERSION_LEN + 2;

/// Decoded edit packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_type: PacketType,
    pub version: u8,
    pub sequence: u16,
}

/// Appends the type byte and its protocol version; returns bytes written.
pub fn populate_type_and_version(out: &mut Vec<u8>, packet_type: PacketType) -> usize {
    out.push(packet_type.as_byte());
    out.push(packet_type.version());
    TYPE_AND_VERSION_LEN
}

/// Appends a full edit header; returns bytes written.
pub fn write_edit_header(out: &mut Vec<u8>, packet_type: PacketType, sequence: u16) -> usize {
    let written = populate_type_and_version(out, packet_type);
    out.extend_from_slice(&sequence.to_le_bytes());
    written + 2
}

/// Splits `bytes` into its header and the remaining payload.
pub fn parse_edit_header(bytes: &[u8]) -> Result<(PacketHeader, &[u8]), CodecError> {
    if bytes.len() < EDIT_HEADER_LEN {
        return Err(CodecError::InvalidPacket("shorter than edit header"));
    }
    let packet_type = PacketType::try_from(bytes[0])?;
    let version = bytes[1];
    if version != packet_type.version() {
        return Err(CodecError::InvalidPacket("unsupported packet version"));
    }
    let sequence = u16::from_le_bytes([bytes[2], bytes[3]]);
    Ok((
        PacketHeader {
            packet_type,
            version,
            sequence,
        },
        &bytes[EDIT_HEADER_LEN..],
    ))
}
