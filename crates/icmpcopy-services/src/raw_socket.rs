//! Raw ICMPv4 socket transport.
//!
//! Platform assumption: on Linux and the BSDs a `SOCK_RAW`/`IPPROTO_ICMP`
//! socket delivers each datagram with its IPv4 header still attached. The
//! receive loop strips it (`SocketConfig::ip_header_len`); this transport
//! hands datagrams up untouched.
//!
//! The buffer carries one byte past `recv_buffer_len`. `read` silently
//! discards whatever does not fit, so a read that reaches that extra byte
//! is reported as `Received::Truncated` instead of as data.

use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use icmpcopy_core::config::SocketConfig;

use crate::transport::{Received, SocketError, Transport};

/// A raw ICMP socket. Closed when dropped.
pub struct RawIcmpSocket {
    socket: Socket,
    buf: Vec<u8>,
    recv_limit: usize,
    read_timeout: Option<Duration>,
}

impl RawIcmpSocket {
    /// Open and bind a raw ICMP socket. Needs root or CAP_NET_RAW.
    pub fn open(config: &SocketConfig) -> Result<Self, SocketError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(SocketError::Open)?;

        let local = SocketAddrV4::new(config.bind_addr, 0);
        socket
            .bind(&SockAddr::from(local))
            .map_err(|source| SocketError::Bind {
                addr: config.bind_addr,
                source,
            })?;

        socket
            .set_write_timeout(Some(config.send_timeout()))
            .map_err(SocketError::Configure)?;

        tracing::debug!(
            bind = %config.bind_addr,
            recv_buffer_len = config.recv_buffer_len,
            "raw ICMP socket open"
        );

        Ok(Self {
            socket,
            buf: vec![0u8; config.recv_buffer_len + 1],
            recv_limit: config.recv_buffer_len,
            read_timeout: None,
        })
    }
}

impl Transport for RawIcmpSocket {
    fn send(&mut self, bytes: &[u8], dest: Ipv4Addr) -> Result<(), SocketError> {
        // Port is meaningless for ICMP.
        let addr = SockAddr::from(SocketAddrV4::new(dest, 0));
        self.socket
            .send_to(bytes, &addr)
            .map_err(|source| SocketError::Send { dest, source })?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Received, SocketError> {
        if self.read_timeout != Some(timeout) {
            self.socket
                .set_read_timeout(Some(timeout))
                .map_err(SocketError::Configure)?;
            self.read_timeout = Some(timeout);
        }

        match self.socket.read(&mut self.buf) {
            Ok(len) => Ok(classify_read(&self.buf, len, self.recv_limit)),
            Err(e) if is_timeout(&e) => Ok(Received::Timeout),
            Err(e) => Err(SocketError::Receive(e)),
        }
    }
}

/// A read of more than `limit` bytes overflowed the receive buffer.
fn classify_read(buf: &[u8], len: usize, limit: usize) -> Received {
    if len > limit {
        return Received::Truncated { len: limit };
    }
    Received::Datagram(Bytes::copy_from_slice(&buf[..len]))
}

/// SO_RCVTIMEO expiry surfaces as EAGAIN on Unix and ETIMEDOUT elsewhere.
/// A signal interrupting the wait is retried the same way.
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Resolve a host name or dotted-quad literal to its first IPv4 address.
pub fn resolve_ipv4(host: &str) -> io::Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }
    (host, 0)
        .to_socket_addrs()?
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no IPv4 address for host '{host}'"),
            )
        })
}
