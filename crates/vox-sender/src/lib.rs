//! Outbound voxel edit packet sender.
//!
//! This crate batches encoded edits into per-server packets, routes them by
//! server jurisdiction, and buffers everything produced before any voxel
//! server is known, replaying it once servers appear.

pub mod batch;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod jurisdiction;
pub mod packet;
pub mod registry;
pub mod router;
pub mod sender;
pub mod state;

pub use config::SenderConfig;
pub use error::SenderError;
pub use jurisdiction::{JurisdictionMap, JurisdictionMaps};
pub use registry::{Destination, DestinationRegistry, NodeList};
pub use router::NodeTarget;
pub use sender::EditPacketSender;
pub use state::SenderStats;
