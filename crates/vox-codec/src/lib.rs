//! Voxel edit wire codec.
//!
//! Defines the edit packet header, edit record encoding, and the parsers
//! used to inspect released packets.

pub mod edit;
pub mod error;
pub mod header;
