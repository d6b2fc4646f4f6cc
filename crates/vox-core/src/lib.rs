//! Core voxel edit primitives shared across crates.
//!
//! Includes node/packet identifiers, octal-code helpers, and base errors.

pub mod error;
pub mod octal;
pub mod types;

pub use octal::OctalCode;
pub use types::{NodeId, NodeKind, PacketType, MAX_PACKET_SIZE};
