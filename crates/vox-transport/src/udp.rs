use std::collections::VecDeque;
use std::io;
use std::net::{SocketAddr, UdpSocket};

use thiserror::Error;
use tracing::{debug, warn};

use crate::sink::{PacketSink, SinkHealthSnapshot};

#[derive(Debug, Error)]
pub enum UdpSinkError {
    #[error("udp io error: {0}")]
    Io(#[from] io::Error),
    #[error("outbound queue full ({0} packets)")]
    QueueFull(usize),
}

/// Pacing limits for [`UdpSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpSinkConfig {
    /// Packets written to the socket per `process` call.
    pub packets_per_step: usize,
    /// Packets held between steps before new ones are refused.
    pub max_queued_packets: usize,
}

impl Default for UdpSinkConfig {
    fn default() -> Self {
        Self {
            packets_per_step: 64,
            max_queued_packets: 4096,
        }
    }
}

/// Paced UDP sink: packets queue on `queue_packet` and leave on `process`.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    queue: VecDeque<(SocketAddr, Vec<u8>)>,
    config: UdpSinkConfig,
    send_ok: u64,
    send_err: u64,
    bytes_ok: u64,
    last_error: Option<String>,
}

impl UdpSink {
    /// Binds a non-blocking socket on `bind`.
    pub fn bind(bind: SocketAddr, config: UdpSinkConfig) -> Result<Self, UdpSinkError> {
        let socket = UdpSocket::bind(bind)?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            queue: VecDeque::new(),
            config,
            send_ok: 0,
            send_err: 0,
            bytes_ok: 0,
            last_error: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, UdpSinkError> {
        Ok(self.socket.local_addr()?)
    }
}

impl PacketSink for UdpSink {
    type Addr = SocketAddr;
    type Error = UdpSinkError;

    fn queue_packet(&mut self, addr: &Self::Addr, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.queue.len() >= self.config.max_queued_packets {
            self.send_err += 1;
            return Err(UdpSinkError::QueueFull(self.queue.len()));
        }
        self.queue.push_back((*addr, bytes.to_vec()));
        Ok(())
    }

    fn process(&mut self) -> Result<usize, Self::Error> {
        let mut sent = 0;
        while sent < self.config.packets_per_step {
            let Some((addr, bytes)) = self.queue.pop_front() else {
                break;
            };
            match self.socket.send_to(&bytes, addr) {
                Ok(_) => {
                    sent += 1;
                    self.send_ok += 1;
                    self.bytes_ok += bytes.len() as u64;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    debug!(%addr, "udp socket would block; retrying next step");
                    self.queue.push_front((addr, bytes));
                    break;
                }
                Err(err) => {
                    warn!(%addr, %err, "udp send failed; packet dropped");
                    self.send_err += 1;
                    self.last_error = Some(err.to_string());
                }
            }
        }
        Ok(sent)
    }

    fn pending_packets(&self) -> usize {
        self.queue.len()
    }

    fn health_snapshot(&self) -> SinkHealthSnapshot {
        SinkHealthSnapshot {
            outbound_queued: self.queue.len() as u64,
            outbound_send_ok: self.send_ok,
            outbound_send_err: self.send_err,
            outbound_bytes: self.bytes_ok,
            last_error: self.last_error.clone(),
        }
    }
}
