use vox_codec::header::EDIT_HEADER_LEN;
use vox_core::types::NodeId;

use crate::jurisdiction::{Area, JurisdictionMaps};
use crate::registry::{voxel_servers, Destination};

/// Which servers a complete packet is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTarget {
    Node(NodeId),
    AllServers,
    /// Servers whose jurisdiction contains the edit carried after the
    /// packet header.
    Owners,
}

/// Returns the voxel servers whose jurisdiction contains the octal code at
/// the head of `encoded_edit`, in registry order.
///
/// Without any jurisdiction maps every reachable voxel server is returned.
/// A server missing from configured maps is treated as owning everything.
pub fn route<A>(
    encoded_edit: &[u8],
    destinations: &[Destination<A>],
    jurisdictions: Option<&JurisdictionMaps>,
) -> Vec<NodeId> {
    voxel_servers(destinations)
        .filter(|d| match jurisdictions.and_then(|maps| maps.get(d.id)) {
            Some(map) => map.is_my_jurisdiction(encoded_edit) == Area::Within,
            None => true,
        })
        .map(|d| d.id)
        .collect()
}

/// Resolves a target for `packet` to `(id, address)` pairs of reachable
/// voxel servers.
pub fn resolve_target<A: Clone>(
    target: NodeTarget,
    packet: &[u8],
    destinations: &[Destination<A>],
    jurisdictions: Option<&JurisdictionMaps>,
) -> Vec<(NodeId, A)> {
    let owners = match target {
        NodeTarget::Owners => {
            let edit = packet.get(EDIT_HEADER_LEN..).unwrap_or_default();
            Some(route(edit, destinations, jurisdictions))
        }
        NodeTarget::Node(_) | NodeTarget::AllServers => None,
    };
    voxel_servers(destinations)
        .filter(|d| match target {
            NodeTarget::Node(id) => d.id == id,
            NodeTarget::AllServers => true,
            NodeTarget::Owners => owners.as_ref().is_some_and(|ids| ids.contains(&d.id)),
        })
        .filter_map(|d| d.active_addr.clone().map(|addr| (d.id, addr)))
        .collect()
}
