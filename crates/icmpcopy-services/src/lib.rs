//! icmpcopy-services — the tunnel protocol over a transport.
//!
//! The sender and receiver loops only see the `Transport` trait, so the
//! whole protocol runs unchanged over a raw ICMP socket or an in-memory
//! fake.

pub mod error;
pub mod file_transfer;
pub mod raw_socket;
pub mod receive;
pub mod send;
pub mod session;
pub mod transport;

pub use error::TransferError;
pub use file_transfer::ChunkReader;
pub use raw_socket::{resolve_ipv4, RawIcmpSocket};
pub use receive::{receive_stream, ReceiveOptions, ReceiveReport};
pub use send::{send_stream, SendReport};
pub use session::{transition, Action, SessionState};
pub use transport::{MemoryTransport, Received, SocketError, Transport};
