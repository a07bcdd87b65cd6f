//! File chunking — the sender's sequential read cursor.

use std::io::{self, Read};

use bytes::Bytes;
use icmpcopy_core::wire::MAX_PAYLOAD;

use crate::error::TransferError;

/// Splits a byte source into fixed-size chunks.
///
/// Every chunk is exactly `chunk_size` bytes except the last, which holds
/// whatever remains. Short reads from the underlying reader are coalesced,
/// so chunk boundaries depend only on the source length.
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
    exhausted: bool,
}

impl<R: Read> ChunkReader<R> {
    /// `chunk_size` must fit one packet: 1..=`MAX_PAYLOAD`.
    pub fn new(source: R, chunk_size: usize) -> Result<Self, TransferError> {
        if chunk_size == 0 || chunk_size > MAX_PAYLOAD {
            return Err(TransferError::InvalidChunkSize(chunk_size));
        }
        Ok(Self {
            source,
            chunk_size,
            exhausted: false,
        })
    }

    /// Next chunk, or `None` once the source is exhausted.
    pub fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut chunk = Vec::with_capacity(self.chunk_size);
        (&mut self.source)
            .take(self.chunk_size as u64)
            .read_to_end(&mut chunk)?;

        if chunk.len() < self.chunk_size {
            self.exhausted = true;
        }
        if chunk.is_empty() {
            return Ok(None);
        }
        Ok(Some(Bytes::from(chunk)))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}
