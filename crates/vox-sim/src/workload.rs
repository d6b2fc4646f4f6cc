use rand::{rngs::StdRng, Rng, SeedableRng};
use vox_codec::edit::{parse_edit_packet, EditDetail};
use vox_codec::error::CodecError;
use vox_core::octal::point_to_voxel;
use vox_core::types::{NodeId, NodeKind, PacketType};
use vox_sender::{
    EditPacketSender, JurisdictionMap, JurisdictionMaps, NodeList, SenderConfig, SenderError,
    SenderStats,
};
use vox_transport::InMemorySink;

use crate::scenarios::EditScenario;

pub type SimSender = EditPacketSender<NodeList<String>, InMemorySink>;

/// Steps run by the simulated send loop, in edits between steps.
pub const STEP_EVERY: usize = 16;

pub fn server_addr(id: u16) -> String {
    format!("vs-{id}")
}

/// Random edit inside the unit cube, sized between a half and 1/256.
pub fn random_detail(rng: &mut impl Rng) -> EditDetail {
    let depth = rng.gen_range(1..=8);
    EditDetail {
        x: rng.gen_range(0.0..1.0),
        y: rng.gen_range(0.0..1.0),
        z: rng.gen_range(0.0..1.0),
        s: 1.0 / (1_u32 << depth) as f32,
        red: rng.gen(),
        green: rng.gen(),
        blue: rng.gen(),
    }
}

/// Mostly set edits with occasional erases, so type changes flush packets.
pub fn random_packet_type(rng: &mut impl Rng) -> PacketType {
    match rng.gen_range(0..10) {
        0 => PacketType::EraseVoxel,
        1 => PacketType::SetVoxelDestructive,
        _ => PacketType::SetVoxel,
    }
}

/// Server `k` owns first-level octant `k - 1`.
pub fn octant_jurisdictions(servers: u16) -> Result<JurisdictionMaps, SenderError> {
    let mut maps = JurisdictionMaps::default();
    for octant in 0..servers.min(8) {
        let center = |bit: u16| if octant & bit != 0 { 0.75 } else { 0.25 };
        let root = point_to_voxel(center(4), center(2), center(1), 0.5)
            .map_err(|err| SenderError::Codec(CodecError::from(err)))?;
        maps.insert(NodeId(octant + 1), JurisdictionMap::new(Some(root), Vec::new()));
    }
    Ok(maps)
}

pub fn register_servers(sender: &SimSender, servers: u16) {
    for id in 1..=servers {
        sender
            .registry()
            .add_node(NodeId(id), NodeKind::VoxelServer, Some(server_addr(id)));
    }
}

/// What one scenario run left on the wire.
#[derive(Debug)]
pub struct ScenarioRun {
    pub stats: SenderStats,
    pub packets: Vec<(String, Vec<u8>)>,
    pub queued_edits: usize,
    /// Largest pre-server backlog observed between producer calls.
    pub max_pending_seen: usize,
}

impl ScenarioRun {
    /// Edit records across every packet.
    pub fn delivered_records(&self) -> Result<usize, CodecError> {
        self.packets
            .iter()
            .map(|(_, bytes)| parse_edit_packet(bytes).map(|(_, records)| records.len()))
            .sum()
    }
}

/// Drives a sender with a seeded workload and collects everything it sent.
pub fn run_scenario(seed: u64, scenario: &EditScenario) -> Result<ScenarioRun, SenderError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let config = SenderConfig {
        max_packet_size: scenario.max_packet_size,
        max_pending_messages: scenario.max_pending_messages,
        sending_enabled: true,
    };
    let sender = EditPacketSender::new(NodeList::default(), InMemorySink::default(), config)?;
    if scenario.octant_jurisdictions {
        sender.set_jurisdictions(Some(octant_jurisdictions(scenario.servers)?));
    }

    let mut max_pending_seen = 0;
    let mut discovered = false;
    for i in 0..scenario.edits {
        if i == scenario.discovery_after {
            register_servers(&sender, scenario.servers);
            sender.step()?;
            discovered = true;
        }

        let detail = random_detail(&mut rng);
        sender.queue_edits(random_packet_type(&mut rng), &[detail]);
        max_pending_seen = max_pending_seen.max(sender.pending_pre_server());

        if scenario.flush_every > 0 && (i + 1) % scenario.flush_every == 0 {
            sender.request_flush();
        }
        if discovered && (i + 1) % STEP_EVERY == 0 {
            sender.step()?;
        }
    }

    if !discovered {
        register_servers(&sender, scenario.servers);
    }
    sender.step()?;
    sender.request_flush();
    sender.step()?;

    Ok(ScenarioRun {
        stats: sender.stats(),
        packets: sender.with_sink(|sink| sink.take_outbound()),
        queued_edits: scenario.edits,
        max_pending_seen,
    })
}
