//! Receiver — watch every inbound ICMP datagram, keep the tunnel's.
//!
//! A raw ICMP socket sees all ICMP traffic on the host, so anything that
//! does not parse or does not belong to the session is dropped without
//! comment. Payloads are appended in arrival order; there is no reordering,
//! loss detection, or checksum verification.
//!
//! Each accepted payload is flushed to the sink before the next receive,
//! so an interrupted receiver leaves everything accepted so far on disk.

use std::io::Write;
use std::time::Duration;

use icmpcopy_core::config::SocketConfig;
use icmpcopy_core::wire::{decode, strip_ipv4_header};

use crate::error::TransferError;
use crate::session::{transition, Action, SessionState};
use crate::transport::{Received, Transport};

/// Receive-side knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Per-receive poll interval. Expiry only restarts the wait.
    pub timeout: Duration,
    /// IPv4 header bytes to drop before decoding.
    pub ip_header_len: usize,
}

impl From<&SocketConfig> for ReceiveOptions {
    fn from(config: &SocketConfig) -> Self {
        Self {
            timeout: config.recv_timeout(),
            ip_header_len: config.ip_header_len,
        }
    }
}

/// Summary of a completed receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Data payloads appended to the sink.
    pub data_packets: u64,
    /// Bytes appended to the sink.
    pub bytes: u64,
    /// Datagrams that were malformed or not part of the session.
    pub ignored: u64,
}

/// Run the receive loop until the session close signal.
///
/// Returns only on close or on a fatal socket / sink error. The sink is
/// flushed after every appended payload.
pub fn receive_stream<T, W>(
    transport: &mut T,
    mut sink: W,
    options: &ReceiveOptions,
) -> Result<ReceiveReport, TransferError>
where
    T: Transport,
    W: Write,
{
    let mut state = SessionState::default();
    let mut report = ReceiveReport::default();

    tracing::info!(timeout_ms = options.timeout.as_millis() as u64, "listening");

    loop {
        let datagram = match transport.receive(options.timeout)? {
            Received::Datagram(d) => d,
            Received::Timeout => continue,
            Received::Truncated { len } => {
                tracing::warn!(len, "datagram overflowed receive buffer, skipping");
                report.ignored += 1;
                continue;
            }
        };

        let Some(icmp) = strip_ipv4_header(&datagram, options.ip_header_len) else {
            tracing::trace!(len = datagram.len(), "datagram shorter than IP header, skipping");
            report.ignored += 1;
            continue;
        };

        let packet = match decode(icmp) {
            Ok(p) => p,
            Err(e) => {
                tracing::trace!(error = %e, "undecodable ICMP message, skipping");
                report.ignored += 1;
                continue;
            }
        };

        let (next, action) = transition(state, &packet);

        match action {
            Action::Ignore if next == SessionState::Open && state == SessionState::Closed => {
                tracing::info!("new session established");
            }
            Action::Ignore => {
                tracing::trace!(
                    icmp_type = packet.icmp_type,
                    identifier = packet.identifier,
                    ?state,
                    "packet not part of session"
                );
                report.ignored += 1;
            }
            Action::AppendPayload => {
                sink.write_all(&packet.payload).map_err(TransferError::Sink)?;
                sink.flush().map_err(TransferError::Sink)?;
                report.data_packets += 1;
                report.bytes += packet.payload.len() as u64;
                tracing::debug!(
                    sequence = packet.sequence,
                    len = packet.payload.len(),
                    "data written"
                );
            }
            Action::StopLoop => {
                sink.flush().map_err(TransferError::Sink)?;
                tracing::info!(
                    data_packets = report.data_packets,
                    bytes = report.bytes,
                    close_sequence = packet.sequence,
                    "session closed"
                );
                return Ok(report);
            }
        }

        state = next;
    }
}
