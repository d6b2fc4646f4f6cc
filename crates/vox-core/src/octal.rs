//! Octal codes address one cube of the voxel octree.
//!
//! Wire form: one byte holding the number of three-bit sections, followed by
//! the sections packed most-significant-bit first. Each section picks one of
//! the eight children of the previous cube (`x` = `0b100`, `y` = `0b010`,
//! `z` = `0b001`). A code with zero sections is the root cube.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VoxError;

/// Deepest tree level `point_to_voxel` will address.
pub const MAX_OCTAL_SECTIONS: u8 = 32;

/// Bytes needed to store a code with `sections` three-bit sections.
pub fn bytes_required_for_code_length(sections: u8) -> usize {
    1 + (usize::from(sections) * 3 + 7) / 8
}

/// Validates the code at the head of `bytes` and returns its length in bytes.
pub fn code_length(bytes: &[u8]) -> Result<usize, VoxError> {
    let sections = *bytes.first().ok_or(VoxError::TruncatedOctalCode {
        needed: 1,
        available: 0,
    })?;
    let needed = bytes_required_for_code_length(sections);
    if bytes.len() < needed {
        return Err(VoxError::TruncatedOctalCode {
            needed,
            available: bytes.len(),
        });
    }
    Ok(needed)
}

/// Returns section `index` of an already validated code.
fn section_at(code: &[u8], index: usize) -> u8 {
    let bit = index * 3;
    let byte = 1 + bit / 8;
    let shift = bit % 8;
    let hi = u16::from(code[byte]) << 8;
    let lo = code.get(byte + 1).copied().map(u16::from).unwrap_or(0);
    (((hi | lo) >> (13 - shift)) & 0b111) as u8
}

/// Returns true when `ancestor` is `descendant` itself or one of its parents.
///
/// Both codes are validated first; malformed input is never an ancestor.
pub fn is_ancestor_of(ancestor: &[u8], descendant: &[u8]) -> bool {
    if code_length(ancestor).is_err() || code_length(descendant).is_err() {
        return false;
    }
    let ancestor_sections = usize::from(ancestor[0]);
    if usize::from(descendant[0]) < ancestor_sections {
        return false;
    }
    (0..ancestor_sections).all(|i| section_at(ancestor, i) == section_at(descendant, i))
}

/// Converts a unit-cube position plus voxel size into the enclosing code.
///
/// The voxel size is rounded down to the nearest power-of-two cube edge.
pub fn point_to_voxel(x: f32, y: f32, z: f32, s: f32) -> Result<OctalCode, VoxError> {
    for v in [x, y, z] {
        if !(0.0..1.0).contains(&v) {
            return Err(VoxError::InvalidInput("voxel position outside unit cube"));
        }
    }
    if !(s > 0.0 && s <= 1.0) {
        return Err(VoxError::InvalidInput("voxel size must be in (0, 1]"));
    }

    let mut sections = 0_u8;
    let mut edge = 1.0_f32;
    while edge > s {
        if sections == MAX_OCTAL_SECTIONS {
            return Err(VoxError::InvalidInput("voxel size below tree resolution"));
        }
        edge /= 2.0;
        sections += 1;
    }

    let mut bytes = vec![0_u8; bytes_required_for_code_length(sections)];
    bytes[0] = sections;
    let (mut ox, mut oy, mut oz) = (0.0_f32, 0.0_f32, 0.0_f32);
    let mut half = 0.5_f32;
    for index in 0..usize::from(sections) {
        let mut octant = 0_u8;
        if x >= ox + half {
            octant |= 0b100;
            ox += half;
        }
        if y >= oy + half {
            octant |= 0b010;
            oy += half;
        }
        if z >= oz + half {
            octant |= 0b001;
            oz += half;
        }
        half /= 2.0;

        let bit = index * 3;
        let byte = 1 + bit / 8;
        let shift = bit % 8;
        let placed = u16::from(octant) << (13 - shift);
        bytes[byte] |= (placed >> 8) as u8;
        if let Some(next) = bytes.get_mut(byte + 1) {
            *next |= (placed & 0xff) as u8;
        }
    }

    Ok(OctalCode(bytes))
}

/// Owned, validated octal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OctalCode(Vec<u8>);

impl OctalCode {
    /// The root cube (zero sections).
    pub fn root() -> Self {
        Self(vec![0])
    }

    /// Copies the code at the head of `bytes`, ignoring trailing data.
    pub fn from_prefix(bytes: &[u8]) -> Result<Self, VoxError> {
        let len = code_length(bytes)?;
        Ok(Self(bytes[..len].to_vec()))
    }

    /// Parses a hex-encoded code; trailing bytes are rejected.
    pub fn from_hex(text: &str) -> Result<Self, VoxError> {
        let bytes =
            hex::decode(text.trim()).map_err(|_| VoxError::InvalidInput("octal code is not hex"))?;
        let len = code_length(&bytes)?;
        if len != bytes.len() {
            return Err(VoxError::InvalidInput("octal code has trailing bytes"));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of three-bit sections (tree depth).
    pub fn sections(&self) -> u8 {
        self.0[0]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// See [`is_ancestor_of`].
    pub fn is_ancestor_of(&self, descendant: &[u8]) -> bool {
        is_ancestor_of(&self.0, descendant)
    }
}

impl fmt::Display for OctalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for OctalCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for OctalCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        OctalCode::from_hex(&text).map_err(serde::de::Error::custom)
    }
}
