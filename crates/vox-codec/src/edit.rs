use serde::{Deserialize, Serialize};
use vox_core::octal::{code_length, point_to_voxel};
use vox_core::types::{PacketType, MAX_PACKET_SIZE};

use crate::error::CodecError;
use crate::header::{parse_edit_header, write_edit_header, PacketHeader};

/// Color bytes trailing each octal code.
pub const EDIT_COLOR_LEN: usize = 3;

/// One voxel edit: unit-cube position, cube edge, and color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditDetail {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub s: f32,
    #[serde(default)]
    pub red: u8,
    #[serde(default)]
    pub green: u8,
    #[serde(default)]
    pub blue: u8,
}

/// Borrowed view of one encoded edit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditRecord<'a> {
    pub code: &'a [u8],
    pub color: [u8; 3],
}

/// Appends one `code || r || g || b` record; returns bytes written.
pub fn encode_edit_detail(detail: &EditDetail, out: &mut Vec<u8>) -> Result<usize, CodecError> {
    let code = point_to_voxel(detail.x, detail.y, detail.z, detail.s)?;
    out.extend_from_slice(code.as_bytes());
    out.extend_from_slice(&[detail.red, detail.green, detail.blue]);
    Ok(code.as_bytes().len() + EDIT_COLOR_LEN)
}

/// Encodes edit records back to back, without any header.
///
/// Fails if the result would be longer than `max_len`.
pub fn encode_edit_details(details: &[EditDetail], max_len: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for detail in details {
        encode_edit_detail(detail, &mut out)?;
        if out.len() > max_len {
            return Err(CodecError::TooLarge {
                len: out.len(),
                max: max_len,
            });
        }
    }
    Ok(out)
}

/// Builds a complete, self-contained edit packet: header then records.
pub fn create_edit_message(
    packet_type: PacketType,
    sequence: u16,
    details: &[EditDetail],
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(MAX_PACKET_SIZE);
    let header_len = write_edit_header(&mut out, packet_type, sequence);
    let body = encode_edit_details(details, MAX_PACKET_SIZE - header_len)?;
    out.extend_from_slice(&body);
    Ok(out)
}

/// Splits a header-less payload into its edit records.
pub fn parse_edit_records(mut payload: &[u8]) -> Result<Vec<EditRecord<'_>>, CodecError> {
    let mut records = Vec::new();
    while !payload.is_empty() {
        let code_len = code_length(payload)?;
        let record_len = code_len + EDIT_COLOR_LEN;
        if payload.len() < record_len {
            return Err(CodecError::InvalidPacket("edit record missing color bytes"));
        }
        records.push(EditRecord {
            code: &payload[..code_len],
            color: [
                payload[code_len],
                payload[code_len + 1],
                payload[code_len + 2],
            ],
        });
        payload = &payload[record_len..];
    }
    Ok(records)
}

/// Parses a released edit packet into its header and records.
pub fn parse_edit_packet(bytes: &[u8]) -> Result<(PacketHeader, Vec<EditRecord<'_>>), CodecError> {
    let (header, payload) = parse_edit_header(bytes)?;
    Ok((header, parse_edit_records(payload)?))
}

#[cfg(test)]
mod tests {
    use super::{
        create_edit_message, encode_edit_details, parse_edit_packet, parse_edit_records,
        EditDetail,
    };
    use crate::error::CodecError;
    use crate::header::EDIT_HEADER_LEN;
    use vox_core::types::PacketType;

    fn red_voxel() -> EditDetail {
        EditDetail {
            x: 0.75,
            y: 0.25,
            z: 0.75,
            s: 0.5,
            red: 255,
            green: 0,
            blue: 0,
        }
    }

    #[test]
    fn detail_encodes_code_then_color() {
        let bytes = encode_edit_details(&[red_voxel()], 64).expect("fits");
        assert_eq!(bytes, vec![1, 0b1010_0000, 255, 0, 0]);
    }

    #[test]
    fn details_longer_than_limit_fail() {
        let err = encode_edit_details(&[red_voxel(), red_voxel()], 8).expect_err("too long");
        assert_eq!(err, CodecError::TooLarge { len: 10, max: 8 });
    }

    #[test]
    fn invalid_detail_yields_no_output() {
        let mut bad = red_voxel();
        bad.x = 4.0;
        assert!(encode_edit_details(&[bad], 64).is_err());
    }

    #[test]
    fn message_parses_back_into_records() {
        let message =
            create_edit_message(PacketType::SetVoxelDestructive, 3, &[red_voxel(), red_voxel()])
                .expect("fits");
        assert_eq!(message.len(), EDIT_HEADER_LEN + 10);

        let (header, records) = parse_edit_packet(&message).expect("valid packet");
        assert_eq!(header.packet_type, PacketType::SetVoxelDestructive);
        assert_eq!(header.sequence, 3);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, &[1, 0b1010_0000]);
        assert_eq!(records[1].color, [255, 0, 0]);
    }

    #[test]
    fn record_without_color_is_rejected() {
        assert_eq!(
            parse_edit_records(&[1, 0xa0, 255]),
            Err(CodecError::InvalidPacket("edit record missing color bytes"))
        );
    }
}
