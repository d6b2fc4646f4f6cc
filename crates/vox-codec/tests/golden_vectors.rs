use vox_codec::edit::{create_edit_message, parse_edit_packet, EditDetail};
use vox_codec::header::EDIT_HEADER_LEN;
use vox_core::types::PacketType;

fn read_vector(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/vectors/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(path).expect("vector file must exist");
    hex::decode(text.trim()).expect("vector must be hex")
}

fn detail(x: f32, y: f32, z: f32, s: f32, rgb: [u8; 3]) -> EditDetail {
    EditDetail {
        x,
        y,
        z,
        s,
        red: rgb[0],
        green: rgb[1],
        blue: rgb[2],
    }
}

#[test]
fn set_voxel_message_matches_golden_vector() {
    let message = create_edit_message(
        PacketType::SetVoxel,
        1,
        &[
            detail(0.99, 0.99, 0.99, 0.125, [10, 20, 30]),
            detail(0.1, 0.9, 0.1, 0.5, [1, 2, 3]),
        ],
    )
    .expect("message should encode");

    assert_eq!(message, read_vector("set_voxel_message.hex"));
}

#[test]
fn erase_root_message_matches_golden_vector() {
    let message = create_edit_message(
        PacketType::EraseVoxel,
        0,
        &[detail(0.5, 0.5, 0.5, 1.0, [0, 0, 0])],
    )
    .expect("message should encode");

    assert_eq!(message, read_vector("erase_root_message.hex"));
}

#[test]
fn golden_vectors_parse_back() {
    let bytes = read_vector("set_voxel_message.hex");
    let (header, records) = parse_edit_packet(&bytes).expect("vector should parse");
    assert_eq!(header.packet_type, PacketType::SetVoxel);
    assert_eq!(header.sequence, 1);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].code, &[3, 0xff, 0x80]);
    assert_eq!(records[0].color, [10, 20, 30]);
    assert_eq!(records[1].code, &[1, 0x40]);
    assert_eq!(bytes.len(), EDIT_HEADER_LEN + 6 + 5);
}

#[test]
fn oversized_message_is_rejected() {
    let many = vec![detail(0.99, 0.99, 0.99, 0.125, [1, 1, 1]); 400];
    assert!(create_edit_message(PacketType::SetVoxel, 0, &many).is_err());
}
