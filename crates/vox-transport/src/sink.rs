use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Coarse per-sink transmission counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkHealthSnapshot {
    pub outbound_queued: u64,
    pub outbound_send_ok: u64,
    pub outbound_send_err: u64,
    pub outbound_bytes: u64,
    pub last_error: Option<String>,
}

/// Byte-oriented transmission contract used by the edit packet sender.
///
/// `queue_packet` is fire-and-forget from the caller's point of view: a sink
/// may transmit immediately or hold the packet until its next `process` call.
pub trait PacketSink {
    /// Opaque transport address of a destination.
    type Addr: Clone + Eq + Hash + Debug;
    /// Sink-specific error.
    type Error: Display;

    /// Hands one complete packet over for transmission to `addr`.
    fn queue_packet(&mut self, addr: &Self::Addr, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Base transmission step; returns the number of packets put on the wire.
    fn process(&mut self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    /// Packets accepted but not yet transmitted.
    fn pending_packets(&self) -> usize {
        0
    }

    /// Best-effort counters for diagnostics.
    fn health_snapshot(&self) -> SinkHealthSnapshot {
        SinkHealthSnapshot::default()
    }
}

/// In-memory sink for tests and simulations.
///
/// Every accepted packet is recorded immediately, in acceptance order.
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    outbound: Vec<(String, Vec<u8>)>,
    drop_outbound: bool,
    max_send_bytes: Option<usize>,
    process_calls: u64,
    send_ok: u64,
    send_err: u64,
    bytes_ok: u64,
}

impl InMemorySink {
    /// Creates a sink that rejects packets larger than `max_send_bytes`.
    pub fn with_max_send_bytes(max_send_bytes: usize) -> Self {
        Self {
            max_send_bytes: Some(max_send_bytes),
            ..Self::default()
        }
    }

    /// Drains and returns all packets captured so far.
    pub fn take_outbound(&mut self) -> Vec<(String, Vec<u8>)> {
        std::mem::take(&mut self.outbound)
    }

    /// Packets captured so far, without draining.
    pub fn outbound(&self) -> &[(String, Vec<u8>)] {
        &self.outbound
    }

    /// If enabled, packets are accepted and silently dropped (loss simulation).
    pub fn set_drop_outbound(&mut self, drop_outbound: bool) {
        self.drop_outbound = drop_outbound;
    }

    /// Number of base transmission steps run so far.
    pub fn process_calls(&self) -> u64 {
        self.process_calls
    }
}

impl PacketSink for InMemorySink {
    type Addr = String;
    type Error = &'static str;

    fn queue_packet(&mut self, addr: &Self::Addr, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.max_send_bytes.is_some_and(|max| bytes.len() > max) {
            self.send_err += 1;
            return Err("payload exceeds max_send_bytes");
        }
        if self.drop_outbound {
            self.send_err += 1;
            return Ok(());
        }
        self.outbound.push((addr.clone(), bytes.to_vec()));
        self.send_ok += 1;
        self.bytes_ok += bytes.len() as u64;
        Ok(())
    }

    fn process(&mut self) -> Result<usize, Self::Error> {
        self.process_calls += 1;
        Ok(0)
    }

    fn health_snapshot(&self) -> SinkHealthSnapshot {
        SinkHealthSnapshot {
            outbound_queued: self.outbound.len() as u64,
            outbound_send_ok: self.send_ok,
            outbound_send_err: self.send_err,
            outbound_bytes: self.bytes_ok,
            last_error: None,
        }
    }
}
