use std::sync::{Arc, PoisonError, RwLock};

use vox_core::types::{NodeId, NodeKind};

/// One node as seen in a registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination<A> {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Transport address; `None` until the node is reachable.
    pub active_addr: Option<A>,
}

impl<A> Destination<A> {
    pub fn new(id: NodeId, kind: NodeKind, active_addr: Option<A>) -> Self {
        Self {
            id,
            kind,
            active_addr,
        }
    }

    /// Reachable voxel server, i.e. a valid edit destination.
    pub fn is_voxel_server(&self) -> bool {
        self.kind == NodeKind::VoxelServer && self.active_addr.is_some()
    }
}

/// Source of node snapshots. Liveness is owned by the implementor.
pub trait DestinationRegistry {
    type Addr: Clone;

    /// Current nodes in registry order.
    fn snapshot(&self) -> Vec<Destination<Self::Addr>>;
}

/// Reachable voxel servers of a snapshot, in registry order.
pub fn voxel_servers<A>(snapshot: &[Destination<A>]) -> impl Iterator<Item = &Destination<A>> {
    snapshot.iter().filter(|d| d.is_voxel_server())
}

pub fn voxel_servers_exist<A>(snapshot: &[Destination<A>]) -> bool {
    voxel_servers(snapshot).next().is_some()
}

impl<A: Clone> DestinationRegistry for Vec<Destination<A>> {
    type Addr = A;

    fn snapshot(&self) -> Vec<Destination<A>> {
        self.clone()
    }
}

/// Shared, cloneable node list updated by discovery and read by senders.
#[derive(Debug)]
pub struct NodeList<A> {
    nodes: Arc<RwLock<Vec<Destination<A>>>>,
}

impl<A> Clone for NodeList<A> {
    fn clone(&self) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
        }
    }
}

impl<A> Default for NodeList<A> {
    fn default() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<A: Clone> NodeList<A> {
    /// Adds a node, replacing any existing entry with the same id in place.
    pub fn add_node(&self, id: NodeId, kind: NodeKind, active_addr: Option<A>) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let node = Destination::new(id, kind, active_addr);
        match nodes.iter_mut().find(|n| n.id == id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
    }

    /// Updates the active address; returns false for unknown ids.
    pub fn set_active_addr(&self, id: NodeId, active_addr: Option<A>) -> bool {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        match nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.active_addr = active_addr;
                true
            }
            None => false,
        }
    }

    pub fn remove_node(&self, id: NodeId) -> bool {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let before = nodes.len();
        nodes.retain(|n| n.id != id);
        nodes.len() != before
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: Clone> DestinationRegistry for NodeList<A> {
    type Addr = A;

    fn snapshot(&self) -> Vec<Destination<A>> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
