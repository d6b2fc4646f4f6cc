use std::collections::HashMap;

use rand::{rngs::StdRng, Rng, SeedableRng};
use vox_codec::edit::{encode_edit_details, parse_edit_packet};
use vox_codec::header::EDIT_HEADER_LEN;
use vox_core::types::PacketType;
use vox_sender::{EditPacketSender, NodeList, SenderConfig};
use vox_sim::workload::{random_detail, random_packet_type, register_servers, server_addr};
use vox_transport::InMemorySink;

#[test]
fn stress_random_edits_keep_per_server_order_and_size_bound() {
    const CASES: u64 = 12;

    for case in 0..CASES {
        let mut rng = StdRng::seed_from_u64(0x5EED_0000 + case);
        let max_packet_size = rng.gen_range(32..=1500);
        let servers = rng.gen_range(1..=4_u16);
        let edits = rng.gen_range(50..400_usize);
        let discovery_after = rng.gen_range(0..edits);

        let config = SenderConfig {
            max_packet_size,
            max_pending_messages: edits,
            sending_enabled: true,
        };
        let sender = EditPacketSender::new(NodeList::default(), InMemorySink::default(), config)
            .expect("valid config");

        let mut expected: Vec<(PacketType, Vec<u8>)> = Vec::new();
        for i in 0..edits {
            if i == discovery_after {
                register_servers(&sender, servers);
                sender.step().expect("step");
            }
            let detail = random_detail(&mut rng);
            let packet_type = random_packet_type(&mut rng);
            let encoded = encode_edit_details(&[detail], max_packet_size - EDIT_HEADER_LEN)
                .expect("small edit encodes");
            sender.queue_for_batching(packet_type, &encoded);
            expected.push((packet_type, encoded));

            if rng.gen_ratio(1, 20) {
                sender.request_flush();
            }
            if rng.gen_ratio(1, 8) {
                sender.step().expect("step");
            }
        }
        sender.request_flush();
        sender.step().expect("step");

        let outbound = sender.with_sink(|s| s.take_outbound());
        let mut per_server: HashMap<String, Vec<(PacketType, Vec<u8>)>> = HashMap::new();
        for (addr, bytes) in &outbound {
            assert!(bytes.len() <= max_packet_size, "case {case}: oversized packet");
            let (header, records) = parse_edit_packet(bytes).expect("well formed packet");
            assert!(!records.is_empty(), "case {case}: empty packet released");
            for record in records {
                let mut edit = record.code.to_vec();
                edit.extend_from_slice(&record.color);
                per_server
                    .entry(addr.clone())
                    .or_default()
                    .push((header.packet_type, edit));
            }
        }

        assert_eq!(per_server.len(), usize::from(servers), "case {case}");
        for id in 1..=servers {
            assert_eq!(
                per_server.get(&server_addr(id)),
                Some(&expected),
                "case {case}: server {id} saw a different edit stream"
            );
        }
        assert_eq!(sender.stats().evicted, 0);
    }
}

#[test]
fn packets_are_filled_before_overflowing() {
    let mut rng = StdRng::seed_from_u64(0xF1_11ED);
    let max_packet_size = 128;
    let config = SenderConfig {
        max_packet_size,
        ..SenderConfig::default()
    };
    let sender = EditPacketSender::new(NodeList::default(), InMemorySink::default(), config)
        .expect("valid config");
    register_servers(&sender, 1);

    let mut sizes = Vec::new();
    for _ in 0..500 {
        let encoded = encode_edit_details(&[random_detail(&mut rng)], 124).expect("encodes");
        sizes.push(encoded.len());
        sender.queue_for_batching(PacketType::SetVoxel, &encoded);
    }
    sender.request_flush();

    let outbound = sender.with_sink(|s| s.take_outbound());
    let mut next = 0;
    for (i, (_, bytes)) in outbound.iter().enumerate() {
        let (_, records) = parse_edit_packet(bytes).expect("well formed packet");
        next += records.len();
        if i + 1 < outbound.len() {
            assert!(
                bytes.len() + sizes[next] > max_packet_size,
                "packet {i} released while the next edit still fit"
            );
        }
    }
    assert_eq!(next, sizes.len());
}
