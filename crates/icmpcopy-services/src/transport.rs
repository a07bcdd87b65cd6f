//! Transport capability — the only thing the tunnel needs from a socket.

use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::Bytes;

/// Outcome of a single receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A raw datagram exactly as the transport delivered it.
    Datagram(Bytes),
    /// Nothing arrived within the timeout. Not an error.
    Timeout,
    /// A datagram larger than the receive buffer arrived and was cut
    /// short. Its content is unusable; `len` is how much was kept.
    Truncated { len: usize },
}

/// Send and receive whole datagrams.
///
/// ICMP has no ports, so a destination is an address only.
pub trait Transport {
    fn send(&mut self, bytes: &[u8], dest: Ipv4Addr) -> Result<(), SocketError>;

    fn receive(&mut self, timeout: Duration) -> Result<Received, SocketError>;
}

/// Socket failures other than a receive timeout.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("failed to open raw ICMP socket (root or CAP_NET_RAW required): {0}")]
    Open(#[source] io::Error),

    #[error("failed to bind raw socket to {addr}: {source}")]
    Bind { addr: Ipv4Addr, source: io::Error },

    #[error("failed to configure raw socket: {0}")]
    Configure(#[source] io::Error),

    #[error("failed to send to {dest}: {source}")]
    Send { dest: Ipv4Addr, source: io::Error },

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("no more scripted datagrams")]
    Drained,
}

// ── In-memory transport ───────────────────────────────────────────────────────

/// Scripted transport for exercising the protocol without raw sockets.
///
/// Every sent datagram is recorded. `receive` replays the scripted inbound
/// queue in order and fails with `SocketError::Drained` once it is empty,
/// so a receive loop that never sees a close signal ends instead of
/// spinning.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<(Ipv4Addr, Bytes)>,
    inbound: VecDeque<Received>,
    fail_sends: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram for a later `receive`.
    pub fn push_datagram(&mut self, bytes: impl Into<Bytes>) {
        self.inbound.push_back(Received::Datagram(bytes.into()));
    }

    /// Queue a receive timeout.
    pub fn push_timeout(&mut self) {
        self.inbound.push_back(Received::Timeout);
    }

    /// Queue a datagram that overflowed the receive buffer.
    pub fn push_truncated(&mut self, len: usize) {
        self.inbound.push_back(Received::Truncated { len });
    }

    /// Make every subsequent `send` fail.
    pub fn fail_sends(&mut self) {
        self.fail_sends = true;
    }

    /// Datagrams sent so far, in order.
    pub fn sent(&self) -> &[(Ipv4Addr, Bytes)] {
        &self.sent
    }

    /// Number of scripted inbound entries not yet consumed.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, bytes: &[u8], dest: Ipv4Addr) -> Result<(), SocketError> {
        if self.fail_sends {
            return Err(SocketError::Send {
                dest,
                source: io::Error::new(io::ErrorKind::Other, "network unreachable"),
            });
        }
        self.sent.push((dest, Bytes::copy_from_slice(bytes)));
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Received, SocketError> {
        self.inbound.pop_front().ok_or(SocketError::Drained)
    }
}
