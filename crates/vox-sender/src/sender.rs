use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use vox_codec::edit::{create_edit_message, encode_edit_details, EditDetail};
use vox_codec::header::{write_edit_header, EDIT_HEADER_LEN};
use vox_core::types::{NodeId, PacketType};
use vox_transport::PacketSink;

use crate::batch::ReleasedPacket;
use crate::bootstrap::EntryKind;
use crate::config::SenderConfig;
use crate::error::SenderError;
use crate::jurisdiction::JurisdictionMaps;
use crate::registry::{voxel_servers_exist, Destination, DestinationRegistry};
use crate::router::{resolve_target, route, NodeTarget};
use crate::state::{SenderState, SenderStats};

struct SenderInner<S> {
    sink: S,
    state: SenderState,
}

/// Batches, routes, and hands voxel edits to a packet sink.
///
/// Producer calls and [`EditPacketSender::step`] may run on different
/// threads; each call holds one lock for its whole read-then-write.
pub struct EditPacketSender<R, S>
where
    R: DestinationRegistry,
    S: PacketSink<Addr = R::Addr>,
{
    registry: R,
    inner: Mutex<SenderInner<S>>,
}

impl<R, S> EditPacketSender<R, S>
where
    R: DestinationRegistry,
    S: PacketSink<Addr = R::Addr>,
{
    pub fn new(registry: R, sink: S, config: SenderConfig) -> Result<Self, SenderError> {
        config.validate()?;
        Ok(Self {
            registry,
            inner: Mutex::new(SenderInner {
                sink,
                state: SenderState::new(config),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SenderInner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> SenderConfig {
        self.lock().state.config.clone()
    }

    /// Applies to later calls only; buffered content is left alone.
    pub fn set_sending_enabled(&self, enabled: bool) {
        self.lock().state.config.sending_enabled = enabled;
    }

    pub fn sending_enabled(&self) -> bool {
        self.lock().state.config.sending_enabled
    }

    /// Changes the pre-server bound, evicting oldest entries if needed.
    pub fn set_max_pending_messages(&self, max_pending: usize) {
        let mut inner = self.lock();
        let state = &mut inner.state;
        state.config.max_pending_messages = max_pending;
        let evicted = state.pre_server.trim_to(max_pending);
        state.stats.evicted += evicted.len() as u64;
    }

    /// Replaces the jurisdiction maps; `None` broadcasts to every server.
    pub fn set_jurisdictions(&self, jurisdictions: Option<JurisdictionMaps>) {
        self.lock().state.jurisdictions = jurisdictions;
    }

    pub fn voxel_servers_exist(&self) -> bool {
        voxel_servers_exist(&self.registry.snapshot())
    }

    pub fn stats(&self) -> SenderStats {
        self.lock().state.stats
    }

    /// Messages held until a voxel server becomes reachable.
    pub fn pending_pre_server(&self) -> usize {
        self.lock().state.pre_server.len()
    }

    /// Runs `f` against the sink while holding the sender lock.
    pub fn with_sink<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        f(&mut self.lock().sink)
    }

    /// Sends a complete packet right away to every reachable voxel server.
    pub fn send_single(&self, packet_type: PacketType, packet: &[u8]) {
        let mut inner = self.lock();
        if !inner.state.config.sending_enabled {
            return;
        }
        let snapshot = self.registry.snapshot();
        inner.send_to(&snapshot, packet_type, NodeTarget::AllServers, packet);
    }

    /// Sends a complete packet to one node, or to all servers.
    pub fn queue_packet_to_node(&self, target: NodeTarget, packet_type: PacketType, packet: &[u8]) {
        let mut inner = self.lock();
        if !inner.state.config.sending_enabled {
            return;
        }
        let snapshot = self.registry.snapshot();
        inner.send_to(&snapshot, packet_type, target, packet);
    }

    /// Wraps one encoded edit in its own packet and sends it right away to
    /// the servers whose jurisdiction contains it.
    pub fn queue_edit_to_nodes(&self, packet_type: PacketType, encoded_edit: &[u8]) {
        let mut inner = self.lock();
        if !inner.state.config.sending_enabled {
            return;
        }
        if !inner.edit_fits(encoded_edit) {
            return;
        }
        let sequence = inner.state.next_single_sequence();
        let mut packet = Vec::with_capacity(EDIT_HEADER_LEN + encoded_edit.len());
        write_edit_header(&mut packet, packet_type, sequence);
        packet.extend_from_slice(encoded_edit);

        let snapshot = self.registry.snapshot();
        inner.send_to(&snapshot, packet_type, NodeTarget::Owners, &packet);
    }

    /// Adds one encoded edit to the packets of the servers that own it.
    pub fn queue_for_batching(&self, packet_type: PacketType, encoded_edit: &[u8]) {
        let mut inner = self.lock();
        if !inner.state.config.sending_enabled {
            return;
        }
        let snapshot = self.registry.snapshot();
        inner.queue_edit(&snapshot, packet_type, encoded_edit);
    }

    /// Encodes one edit as a complete message and sends it immediately.
    pub fn send_edit(&self, packet_type: PacketType, detail: &EditDetail) {
        let mut inner = self.lock();
        if !inner.state.config.sending_enabled {
            return;
        }
        let sequence = inner.state.next_single_sequence();
        let packet = match create_edit_message(packet_type, sequence, std::slice::from_ref(detail)) {
            Ok(packet) => packet,
            Err(err) => {
                debug!(error = %err, "failed to encode edit; dropping");
                inner.state.stats.encode_failures += 1;
                return;
            }
        };
        let snapshot = self.registry.snapshot();
        inner.send_to(&snapshot, packet_type, NodeTarget::AllServers, &packet);
    }

    /// Encodes each edit on its own and queues it for batching.
    pub fn queue_edits(&self, packet_type: PacketType, details: &[EditDetail]) {
        let mut inner = self.lock();
        if !inner.state.config.sending_enabled {
            return;
        }
        let snapshot = self.registry.snapshot();
        let max_edit_len = inner.state.pending.max_edit_len();
        for detail in details {
            match encode_edit_details(std::slice::from_ref(detail), max_edit_len) {
                Ok(encoded) => inner.queue_edit(&snapshot, packet_type, &encoded),
                Err(err) => {
                    debug!(error = %err, "failed to encode edit; dropping");
                    inner.state.stats.encode_failures += 1;
                }
            }
        }
    }

    /// Releases every partially filled packet, or remembers to once servers
    /// appear.
    pub fn request_flush(&self) {
        let mut inner = self.lock();
        let snapshot = self.registry.snapshot();
        if !voxel_servers_exist(&snapshot) {
            inner.state.pre_server.request_release();
            return;
        }
        let released = inner.state.pending.release_all();
        inner.transmit_all(&snapshot, released);
    }

    /// Releases one server's partially filled packet.
    pub fn release_node(&self, node_id: NodeId) {
        let mut inner = self.lock();
        let snapshot = self.registry.snapshot();
        if let Some(packet) = inner.state.pending.release(node_id) {
            inner.transmit_all(&snapshot, vec![packet]);
        }
    }

    /// Periodic work: replays pre-server messages once a server is reachable,
    /// then runs the sink's transmission step.
    ///
    /// Returns what the sink reports for its step.
    pub fn step(&self) -> Result<usize, SenderError> {
        let mut inner = self.lock();
        let snapshot = self.registry.snapshot();
        let pre_server = &inner.state.pre_server;
        if voxel_servers_exist(&snapshot) && (!pre_server.is_empty() || pre_server.release_pending()) {
            inner.drain_pre_server(&snapshot);
        }
        inner
            .sink
            .process()
            .map_err(|err| SenderError::Sink(err.to_string()))
    }
}

impl<S: PacketSink> SenderInner<S> {
    fn capture(&mut self, kind: EntryKind, packet_type: PacketType, target: NodeTarget, bytes: &[u8]) {
        let state = &mut self.state;
        let max_pending = state.config.max_pending_messages;
        let dropped = state
            .pre_server
            .capture(kind, packet_type, target, bytes.to_vec(), max_pending);
        state.stats.captured += 1;
        if dropped.is_some() {
            state.stats.evicted += 1;
        }
        debug!(?kind, pending = state.pre_server.len(), "no voxel server yet; holding message");
    }

    fn send_to(
        &mut self,
        snapshot: &[Destination<S::Addr>],
        packet_type: PacketType,
        target: NodeTarget,
        packet: &[u8],
    ) {
        if !voxel_servers_exist(snapshot) {
            self.capture(EntryKind::Single, packet_type, target, packet);
            return;
        }
        self.deliver(snapshot, target, packet);
    }

    /// Hands a complete packet to every server `target` resolves to.
    ///
    /// Returns false, after counting a send failure, when none does.
    fn deliver(&mut self, snapshot: &[Destination<S::Addr>], target: NodeTarget, packet: &[u8]) -> bool {
        let addrs = resolve_target(target, packet, snapshot, self.state.jurisdictions.as_ref());
        if addrs.is_empty() {
            warn!(?target, len = packet.len(), "no reachable server for packet; dropping");
            self.state.stats.send_failures += 1;
            return false;
        }
        for (node_id, addr) in addrs {
            self.queue_on_sink(node_id, &addr, packet);
        }
        true
    }

    /// Rejects, with a warning, an edit that can never fit one packet.
    fn edit_fits(&mut self, encoded: &[u8]) -> bool {
        let max_edit_len = self.state.pending.max_edit_len();
        if encoded.len() > max_edit_len {
            warn!(
                len = encoded.len(),
                max = max_edit_len,
                "edit cannot fit any packet; dropping"
            );
            self.state.stats.dropped_edits += 1;
            return false;
        }
        true
    }

    fn queue_edit(&mut self, snapshot: &[Destination<S::Addr>], packet_type: PacketType, encoded: &[u8]) {
        if !self.edit_fits(encoded) {
            return;
        }
        if !voxel_servers_exist(snapshot) {
            self.capture(EntryKind::Batchable, packet_type, NodeTarget::Owners, encoded);
            return;
        }

        let node_ids = route(encoded, snapshot, self.state.jurisdictions.as_ref());
        if node_ids.is_empty() {
            debug!(len = encoded.len(), "no server owns edit; dropping");
            self.state.stats.dropped_edits += 1;
            return;
        }
        let mut released = Vec::new();
        for node_id in node_ids {
            match self.state.pending.append(node_id, packet_type, encoded) {
                Ok(packets) => released.extend(packets),
                Err(err) => {
                    warn!(%node_id, error = %err, "batcher refused edit");
                    self.state.stats.dropped_edits += 1;
                }
            }
        }
        self.transmit_all(snapshot, released);
    }

    fn drain_pre_server(&mut self, snapshot: &[Destination<S::Addr>]) {
        let state = &mut self.state;
        let jurisdictions = state.jurisdictions.as_ref();
        let replay = state
            .pre_server
            .drain_into(&mut state.pending, |edit| route(edit, snapshot, jurisdictions));
        state.stats.replayed += replay.replayed as u64;
        state.stats.dropped_edits += replay.dropped as u64;

        for entry in &replay.singles {
            if self.deliver(snapshot, entry.target, &entry.bytes) {
                self.state.stats.replayed += 1;
            }
        }
        self.transmit_all(snapshot, replay.released);
    }

    fn transmit_all(&mut self, snapshot: &[Destination<S::Addr>], packets: Vec<ReleasedPacket>) {
        for packet in packets {
            let addr = snapshot
                .iter()
                .find(|d| d.id == packet.node_id)
                .and_then(|d| d.active_addr.clone());
            match addr {
                Some(addr) => self.queue_on_sink(packet.node_id, &addr, &packet.bytes),
                None => {
                    warn!(node_id = %packet.node_id, "released packet has no reachable address");
                    self.state.stats.send_failures += 1;
                }
            }
        }
    }

    fn queue_on_sink(&mut self, node_id: NodeId, addr: &S::Addr, bytes: &[u8]) {
        match self.sink.queue_packet(addr, bytes) {
            Ok(()) => {
                self.state.stats.packets_released += 1;
                self.state.stats.bytes_released += bytes.len() as u64;
            }
            Err(err) => {
                warn!(%node_id, ?addr, error = %err, "sink refused packet");
                self.state.stats.send_failures += 1;
            }
        }
    }
}
