//! Transfer errors — everything that ends a send or receive run.

use icmpcopy_core::wire::MAX_PAYLOAD;
use icmpcopy_core::WireError;

use crate::transport::SocketError;

/// A fatal transfer failure. Malformed inbound packets are not errors; the
/// receiver skips them.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error("failed to read source: {0}")]
    Source(#[source] std::io::Error),

    #[error("failed to write output: {0}")]
    Sink(#[source] std::io::Error),

    #[error("failed to encode packet: {0}")]
    Wire(#[from] WireError),

    #[error("chunk size {0} must be between 1 and {max}", max = MAX_PAYLOAD)]
    InvalidChunkSize(usize),
}
