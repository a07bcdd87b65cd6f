//! Sender — open signal, one data packet per chunk, close signal.
//!
//! Fire-and-forget: no acknowledgements, no retries, no pacing. Any send
//! failure ends the transfer.

use std::io::Read;
use std::net::Ipv4Addr;

use icmpcopy_core::wire::FIRST_DATA_SEQUENCE;
use icmpcopy_core::Packet;

use crate::error::TransferError;
use crate::file_transfer::ChunkReader;
use crate::transport::Transport;

/// Summary of a completed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Data packets sent, control packets excluded.
    pub data_packets: u64,
    /// Payload bytes sent.
    pub bytes: u64,
    /// Sequence number carried by the close signal.
    pub close_sequence: u16,
}

/// Stream `source` to `dest` in `chunk_size` pieces.
///
/// An out-of-range `chunk_size` is rejected before anything is sent.
///
/// Data sequence numbers start at 1 and wrap modulo 2^16 on very long
/// sources; receivers never look at them.
pub fn send_stream<T, R>(
    transport: &mut T,
    dest: Ipv4Addr,
    source: R,
    chunk_size: usize,
) -> Result<SendReport, TransferError>
where
    T: Transport,
    R: Read,
{
    let mut chunks = ChunkReader::new(source, chunk_size)?;

    transport.send(&Packet::open().to_bytes()?, dest)?;
    tracing::info!(%dest, "session open sent");

    let mut sequence = FIRST_DATA_SEQUENCE;
    let mut data_packets = 0u64;
    let mut bytes = 0u64;

    while let Some(chunk) = chunks.next_chunk().map_err(TransferError::Source)? {
        let len = chunk.len();
        transport.send(&Packet::data(sequence, chunk).to_bytes()?, dest)?;
        tracing::debug!(sequence, len, "data packet sent");

        data_packets += 1;
        bytes += len as u64;
        sequence = sequence.wrapping_add(1);
    }

    transport.send(&Packet::close(sequence).to_bytes()?, dest)?;
    tracing::info!(%dest, data_packets, bytes, close_sequence = sequence, "session close sent");

    Ok(SendReport {
        data_packets,
        bytes,
        close_sequence: sequence,
    })
}
