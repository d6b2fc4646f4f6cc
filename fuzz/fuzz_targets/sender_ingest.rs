#![no_main]

use libfuzzer_sys::fuzz_target;
use vox_core::types::{NodeId, NodeKind, PacketType};
use vox_sender::{EditPacketSender, NodeList, SenderConfig};
use vox_transport::InMemorySink;

const MAX_PACKET_SIZE: usize = 96;

fuzz_target!(|data: &[u8]| {
    let config = SenderConfig {
        max_packet_size: MAX_PACKET_SIZE,
        max_pending_messages: 8,
        sending_enabled: true,
    };
    let Ok(sender) = EditPacketSender::new(NodeList::default(), InMemorySink::default(), config)
    else {
        return;
    };

    // Each chunk: opcode byte, length byte, then that many payload bytes.
    let mut rest = data;
    while let [op, len, tail @ ..] = rest {
        let len = usize::from(*len).min(tail.len());
        let (payload, next) = tail.split_at(len);
        rest = next;

        let packet_type = match op % 3 {
            0 => PacketType::SetVoxel,
            1 => PacketType::SetVoxelDestructive,
            _ => PacketType::EraseVoxel,
        };
        match op >> 4 {
            0..=7 => sender.queue_for_batching(packet_type, payload),
            8 => sender.send_single(packet_type, payload),
            9 => sender.queue_edit_to_nodes(packet_type, payload),
            10 => sender.request_flush(),
            11 => sender.registry().add_node(
                NodeId(u16::from(op & 0x3)),
                NodeKind::VoxelServer,
                Some(format!("vs-{}", op & 0x3)),
            ),
            12 => {
                sender.registry().remove_node(NodeId(u16::from(op & 0x3)));
            }
            13 => sender.set_sending_enabled(op & 1 == 0),
            _ => {
                let _ = sender.step();
            }
        }
    }

    // Singles pass through unbatched, so only their own length bounds them.
    let limit = MAX_PACKET_SIZE.max(usize::from(u8::MAX));
    sender.with_sink(|sink| {
        assert!(sink.outbound().iter().all(|(_, bytes)| bytes.len() <= limit));
    });
    assert!(sender.pending_pre_server() <= 8);
});
