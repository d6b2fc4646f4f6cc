//! Transmission sinks for voxel edit packets.
//!
//! The sender only depends on the byte-oriented [`sink::PacketSink`] contract
//! defined here; concrete sinks decide how and when bytes leave the process.

pub mod sink;
pub mod udp;

pub use sink::{InMemorySink, PacketSink, SinkHealthSnapshot};
pub use udp::{UdpSink, UdpSinkConfig};
