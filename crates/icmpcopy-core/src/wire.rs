//! icmpcopy wire format — ICMP Echo packets carrying file bytes.
//!
//! A tunnel packet is an ordinary ICMP Echo Request. The identifier field is
//! repurposed as a control channel: `MAGIC` marks a data packet, its 16-bit
//! complement marks a session open/close signal. Everything after the 8-byte
//! header is raw file content.
//!
//! The header is #[repr(C)] with network-endian fields and zerocopy derives,
//! so packing and unpacking need no manual byte shuffling and no unsafe code.

use bytes::Bytes;
use static_assertions::{assert_eq_size, const_assert_eq};
use zerocopy::byteorder::{NetworkEndian, U16};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

// ── Header ────────────────────────────────────────────────────────────────────

/// Fixed ICMP Echo header as it appears on the wire.
///
/// Wire size: 8 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct IcmpHeader {
    /// 8 = Echo Request, 0 = Echo Reply.
    pub icmp_type: u8,
    /// Always 0 for Echo messages.
    pub code: u8,
    /// One's-complement checksum over header and payload, computed with
    /// this field zeroed.
    pub checksum: U16<NetworkEndian>,
    /// `MAGIC` for data, `MAGIC_INVERSE` for session control.
    pub identifier: U16<NetworkEndian>,
    /// 0 for open, 1.. for data, last data sequence + 1 for close.
    pub sequence: U16<NetworkEndian>,
}

assert_eq_size!(IcmpHeader, [u8; 8]);

// ── Constants ─────────────────────────────────────────────────────────────────

/// Identifier carried by every data packet.
pub const MAGIC: u16 = 0xC05E;

/// Identifier carried by session open and close packets.
pub const MAGIC_INVERSE: u16 = !MAGIC;

const_assert_eq!(MAGIC_INVERSE, 0x3FA1);

/// Length of the fixed ICMP header.
pub const HEADER_LEN: usize = 8;

/// Largest payload a single packet may carry (1500 byte MTU minus header).
pub const MAX_PAYLOAD: usize = 1492;

/// Length of the IPv4 header that raw ICMP sockets prepend on receive.
pub const IPV4_HEADER_LEN: usize = 20;

/// Bytes of file content per data packet unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Receive buffer size: the largest IPv4 datagram, so no ICMP message
/// can be cut short by the buffer.
pub const RECV_BUFFER_LEN: usize = 65535;

/// Sequence number of the session open packet.
pub const OPEN_SEQUENCE: u16 = 0;

/// Sequence number of the first data packet.
pub const FIRST_DATA_SEQUENCE: u16 = 1;

// ── ICMP type ─────────────────────────────────────────────────────────────────

/// ICMP message types this tunnel knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    EchoReply = 0,
    EchoRequest = 8,
}

impl TryFrom<u8> for IcmpType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IcmpType::EchoReply),
            8 => Ok(IcmpType::EchoRequest),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

impl From<IcmpType> for u8 {
    fn from(t: IcmpType) -> u8 {
        t as u8
    }
}

// ── Packet ────────────────────────────────────────────────────────────────────

/// A decoded (or to-be-encoded) tunnel packet.
///
/// `icmp_type` stays a raw byte so that any ICMP traffic seen on the raw
/// socket can be decoded and then classified; only Echo Requests are ever
/// emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub icmp_type: u8,
    pub code: u8,
    /// As read from the wire. Never verified on receipt.
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Bytes,
}

impl Packet {
    /// A data packet carrying one chunk of the source file.
    pub fn data(sequence: u16, payload: Bytes) -> Self {
        Self::echo_request(MAGIC, sequence, payload)
    }

    /// The session open signal.
    pub fn open() -> Self {
        Self::echo_request(MAGIC_INVERSE, OPEN_SEQUENCE, Bytes::new())
    }

    /// The session close signal, one past the last data sequence.
    pub fn close(sequence: u16) -> Self {
        Self::echo_request(MAGIC_INVERSE, sequence, Bytes::new())
    }

    fn echo_request(identifier: u16, sequence: u16, payload: Bytes) -> Self {
        Self {
            icmp_type: IcmpType::EchoRequest.into(),
            code: 0,
            checksum: 0,
            identifier,
            sequence,
            payload,
        }
    }

    pub fn is_echo_request(&self) -> bool {
        self.icmp_type == u8::from(IcmpType::EchoRequest)
    }

    /// Echo Request with the data identifier.
    pub fn is_data(&self) -> bool {
        self.is_echo_request() && self.identifier == MAGIC
    }

    /// Echo Request with the control identifier (open or close).
    pub fn is_control(&self) -> bool {
        self.is_echo_request() && self.identifier == MAGIC_INVERSE
    }

    /// Serialize with a freshly computed checksum. The `checksum` field of
    /// `self` is ignored.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        encode(
            IcmpType::try_from(self.icmp_type)?,
            self.code,
            self.identifier,
            self.sequence,
            &self.payload,
        )
    }
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// 16-bit one's-complement checksum.
///
/// Input is zero-padded to a multiple of 4 bytes, then summed as big-endian
/// 16-bit words with end-around carry. Padding to 4 rather than 2 keeps the
/// exact arithmetic of existing peers; trailing zero words do not change
/// the sum.
pub fn checksum(bytes: &[u8]) -> u16 {
    let padded_len = (bytes.len() + 3) & !3;
    let byte_at = |i: usize| u32::from(bytes.get(i).copied().unwrap_or(0));

    let mut sum: u32 = 0;
    for i in (0..padded_len).step_by(2) {
        sum += (byte_at(i) << 8) | byte_at(i + 1);
        if sum > 0xFFFF {
            sum = (sum + 1) & 0xFFFF;
        }
    }
    !(sum as u16)
}

/// Pack a packet: header with zero checksum, checksum over header + payload,
/// header rewritten with the result.
///
/// Output length is always `HEADER_LEN + payload.len()`.
pub fn encode(
    icmp_type: IcmpType,
    code: u8,
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<Vec<u8>, WireError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(WireError::PayloadTooLarge(payload.len()));
    }

    let mut header = IcmpHeader {
        icmp_type: icmp_type.into(),
        code,
        checksum: U16::new(0),
        identifier: U16::new(identifier),
        sequence: U16::new(sequence),
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(payload);

    header.checksum = U16::new(checksum(&bytes));
    bytes[..HEADER_LEN].copy_from_slice(header.as_bytes());

    Ok(bytes)
}

/// Unpack an ICMP message. Everything after the header is payload.
///
/// The checksum is reported, not verified.
pub fn decode(bytes: &[u8]) -> Result<Packet, WireError> {
    let header = IcmpHeader::read_from_prefix(bytes)
        .ok_or(WireError::Truncated { len: bytes.len() })?;

    Ok(Packet {
        icmp_type: header.icmp_type,
        code: header.code,
        checksum: header.checksum.get(),
        identifier: header.identifier.get(),
        sequence: header.sequence.get(),
        payload: Bytes::copy_from_slice(&bytes[HEADER_LEN..]),
    })
}

/// Drop the IPv4 header that Linux and BSD raw ICMP sockets deliver in
/// front of the ICMP message. The header is assumed to be `header_len`
/// bytes; IP options are not parsed.
///
/// Returns `None` if the datagram is not even that long.
pub fn strip_ipv4_header(datagram: &[u8], header_len: usize) -> Option<&[u8]> {
    datagram.get(header_len..)
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when packing or interpreting tunnel packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("malformed packet: {len} bytes is shorter than the {HEADER_LEN}-byte ICMP header")]
    Truncated { len: usize },

    #[error("payload length {0} exceeds maximum {MAX_PAYLOAD}")]
    PayloadTooLarge(usize),

    #[error("unknown ICMP type: {0}")]
    UnknownType(u8),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
