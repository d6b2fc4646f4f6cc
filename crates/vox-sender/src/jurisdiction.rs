use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vox_core::octal::{code_length, is_ancestor_of, OctalCode};
use vox_core::types::NodeId;

use crate::error::SenderError;

/// Where a code sits relative to a server's jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// Strict ancestor of the jurisdiction root.
    Above,
    Within,
    /// Outside the root, under an end node, or malformed.
    Below,
}

/// Octree region owned by one voxel server: everything under `root` except
/// the subtrees under `end_nodes`. No root means the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionMap {
    #[serde(default)]
    pub root: Option<OctalCode>,
    #[serde(default)]
    pub end_nodes: Vec<OctalCode>,
}

impl JurisdictionMap {
    pub fn new(root: Option<OctalCode>, end_nodes: Vec<OctalCode>) -> Self {
        Self { root, end_nodes }
    }

    /// Classifies the octal code at the head of `code`.
    pub fn is_my_jurisdiction(&self, code: &[u8]) -> Area {
        let Ok(len) = code_length(code) else {
            return Area::Below;
        };
        let code = &code[..len];
        let root = self.root.as_ref().map_or(&[0_u8][..], OctalCode::as_bytes);

        if code[0] < root[0] && is_ancestor_of(code, root) {
            return Area::Above;
        }
        if !is_ancestor_of(root, code) {
            return Area::Below;
        }
        if self.end_nodes.iter().any(|end| end.is_ancestor_of(code)) {
            return Area::Below;
        }
        Area::Within
    }
}

/// Jurisdictions of every known voxel server, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JurisdictionMaps {
    maps: HashMap<NodeId, JurisdictionMap>,
}

#[derive(Debug, Deserialize)]
struct JurisdictionFile {
    #[serde(default)]
    server: Vec<ServerJurisdiction>,
}

#[derive(Debug, Deserialize)]
struct ServerJurisdiction {
    node_id: u16,
    #[serde(flatten)]
    map: JurisdictionMap,
}

impl JurisdictionMaps {
    /// Parses a TOML document of `[[server]]` tables with `node_id`, hex
    /// `root`, and hex `end_nodes`.
    pub fn from_toml_str(text: &str) -> Result<Self, SenderError> {
        let file: JurisdictionFile = toml::from_str(text)?;
        let mut maps = Self::default();
        for server in file.server {
            maps.insert(NodeId(server.node_id), server.map);
        }
        Ok(maps)
    }

    pub fn insert(&mut self, node_id: NodeId, map: JurisdictionMap) -> Option<JurisdictionMap> {
        self.maps.insert(node_id, map)
    }

    pub fn get(&self, node_id: NodeId) -> Option<&JurisdictionMap> {
        self.maps.get(&node_id)
    }

    pub fn remove(&mut self, node_id: NodeId) -> Option<JurisdictionMap> {
        self.maps.remove(&node_id)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Area, JurisdictionMap, JurisdictionMaps};
    use vox_core::octal::{point_to_voxel, OctalCode};
    use vox_core::types::NodeId;

    fn code(x: f32, y: f32, z: f32, s: f32) -> OctalCode {
        point_to_voxel(x, y, z, s).expect("valid point")
    }

    #[test]
    fn rootless_map_owns_everything() {
        let map = JurisdictionMap::default();
        assert_eq!(
            map.is_my_jurisdiction(code(0.1, 0.2, 0.3, 0.01).as_bytes()),
            Area::Within
        );
        assert_eq!(map.is_my_jurisdiction(OctalCode::root().as_bytes()), Area::Within);
    }

    #[test]
    fn codes_under_root_are_within_unless_under_end_node() {
        let root = code(0.75, 0.25, 0.75, 0.5);
        let end = code(0.9, 0.45, 0.9, 0.25);
        let map = JurisdictionMap::new(Some(root.clone()), vec![end]);

        assert_eq!(map.is_my_jurisdiction(root.as_bytes()), Area::Within);
        assert_eq!(
            map.is_my_jurisdiction(code(0.55, 0.05, 0.55, 0.125).as_bytes()),
            Area::Within
        );
        assert_eq!(
            map.is_my_jurisdiction(code(0.95, 0.4, 0.95, 0.125).as_bytes()),
            Area::Below
        );
        assert_eq!(
            map.is_my_jurisdiction(code(0.1, 0.1, 0.1, 0.125).as_bytes()),
            Area::Below
        );
        assert_eq!(map.is_my_jurisdiction(OctalCode::root().as_bytes()), Area::Above);
    }

    #[test]
    fn root_cube_with_padding_bits_set_is_within() {
        let root = OctalCode::from_hex("01a0").expect("hex");
        let map = JurisdictionMap::new(Some(root), Vec::new());

        // Same one-section cube as the root; a trailing padding bit is set.
        assert_eq!(map.is_my_jurisdiction(&[1, 0xa1, 1, 2, 3]), Area::Within);
        assert_eq!(map.is_my_jurisdiction(&[0]), Area::Above);
    }

    #[test]
    fn trailing_color_bytes_are_ignored_and_garbage_is_below() {
        let root = code(0.75, 0.25, 0.75, 0.5);
        let map = JurisdictionMap::new(Some(root.clone()), Vec::new());

        let mut edit = code(0.8, 0.3, 0.8, 0.25).as_bytes().to_vec();
        edit.extend_from_slice(&[255, 0, 0]);
        assert_eq!(map.is_my_jurisdiction(&edit), Area::Within);
        assert_eq!(map.is_my_jurisdiction(&[9]), Area::Below);
        assert_eq!(map.is_my_jurisdiction(&[]), Area::Below);
    }

    #[test]
    fn maps_load_from_toml_with_hex_codes() {
        let text = r#"
            [[server]]
            node_id = 1
            root = "01a0"
            end_nodes = ["02b0"]

            [[server]]
            node_id = 2
        "#;
        let maps = JurisdictionMaps::from_toml_str(text).expect("valid jurisdiction file");
        assert_eq!(maps.len(), 2);

        let first = maps.get(NodeId(1)).expect("server 1 present");
        assert_eq!(first.root, Some(OctalCode::from_hex("01a0").expect("hex")));
        assert_eq!(first.end_nodes.len(), 1);
        assert_eq!(maps.get(NodeId(2)), Some(&JurisdictionMap::default()));
        assert!(maps.get(NodeId(3)).is_none());
    }

    #[test]
    fn malformed_toml_code_is_an_error() {
        let text = r#"
            [[server]]
            node_id = 1
            root = "not-hex"
        "#;
        assert!(JurisdictionMaps::from_toml_str(text).is_err());
    }
}
