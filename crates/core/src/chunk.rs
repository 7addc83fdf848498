//! Chunking of oversized payloads.
//!
//! Payloads larger than `max_chunk_size` are split into ordered chunks, each
//! small enough to travel as one packet's payload.
//!
//! # Chunk Header
//!
//! A packet flagged `CHUNKED` carries this header ahead of the chunk data:
//!
//! ```text
//! +-------------------+
//! | sequence (16)     |  0-based chunk index, big-endian
//! +-------------------+
//! | total (16)        |  chunk count, big-endian
//! +-------------------+
//! | data              |  up to max_chunk_size bytes
//! | (variable)        |
//! +-------------------+
//! ```
//!
//! # Reassembly
//!
//! [`reassemble_chunks`] sorts by sequence and requires exactly the
//! contiguous range `[0, total)`. Anything else (a gap, a duplicate, an extra
//! chunk) means the set is not complete yet and yields `None`.

use crate::error::{ChunkError, Result};
use crate::packet::{Packet, PacketFlags, PacketType};

/// Default maximum chunk data size in bytes.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 256;

/// Size of the chunk header in bytes.
pub const CHUNK_HEADER_SIZE: usize = 4;

/// Largest chunk count the 16-bit header fields can describe.
pub const MAX_CHUNKS: usize = u16::MAX as usize;

/// One ordered slice of a larger payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk index within the payload (0-based)
    pub sequence: u16,

    /// Total number of chunks for this payload
    pub total: u16,

    /// Slice of the payload
    pub data: Vec<u8>,

    /// TYPE code of the packet carrying this chunk
    pub packet_type: PacketType,
}

impl Chunk {
    pub fn new(sequence: u16, total: u16, data: Vec<u8>, packet_type: PacketType) -> Self {
        Self {
            sequence,
            total,
            data,
            packet_type,
        }
    }

    /// Wrap this chunk in a packet, adding the `CHUNKED` flag.
    pub fn to_packet(&self, flags: PacketFlags) -> Packet {
        let mut payload = Vec::with_capacity(CHUNK_HEADER_SIZE + self.data.len());
        payload.extend_from_slice(&self.sequence.to_be_bytes());
        payload.extend_from_slice(&self.total.to_be_bytes());
        payload.extend_from_slice(&self.data);

        Packet::new(self.packet_type, flags | PacketFlags::CHUNKED, payload)
    }

    /// Recover a chunk from a `CHUNKED` packet.
    ///
    /// # Errors
    /// - `ChunkError::HeaderTooShort` if the payload can't hold the header
    /// - `ChunkError::InvalidSequence` if sequence >= total
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        let payload = &packet.payload;
        if payload.len() < CHUNK_HEADER_SIZE {
            return Err(ChunkError::HeaderTooShort {
                required: CHUNK_HEADER_SIZE,
                actual: payload.len(),
            }
            .into());
        }

        let sequence = u16::from_be_bytes([payload[0], payload[1]]);
        let total = u16::from_be_bytes([payload[2], payload[3]]);

        if sequence >= total {
            return Err(ChunkError::InvalidSequence { sequence, total }.into());
        }

        Ok(Self {
            sequence,
            total,
            data: payload[CHUNK_HEADER_SIZE..].to_vec(),
            packet_type: packet.packet_type,
        })
    }
}

/// Split `data` into chunks of at most `max_chunk_size` bytes.
///
/// Empty data produces a single empty chunk so that it still reassembles.
///
/// # Errors
/// - `ChunkError::ZeroChunkSize` if `max_chunk_size` is 0
/// - `ChunkError::TooManyChunks` if more than [`MAX_CHUNKS`] would be needed
pub fn chunk_data(data: &[u8], packet_type: PacketType, max_chunk_size: usize) -> Result<Vec<Chunk>> {
    if max_chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize.into());
    }

    let total = data.len().div_ceil(max_chunk_size).max(1);
    if total > MAX_CHUNKS {
        return Err(ChunkError::TooManyChunks {
            count: total,
            max: MAX_CHUNKS,
        }
        .into());
    }

    if data.is_empty() {
        return Ok(vec![Chunk::new(0, 1, Vec::new(), packet_type)]);
    }

    Ok(data
        .chunks(max_chunk_size)
        .enumerate()
        .map(|(sequence, slice)| Chunk::new(sequence as u16, total as u16, slice.to_vec(), packet_type))
        .collect())
}

/// Reassemble a complete chunk set, in any order.
///
/// Returns `None` unless the chunks are exactly sequences `0..total` with one
/// agreed `total`. Pure: the input is not modified.
pub fn reassemble_chunks(chunks: &[Chunk]) -> Option<Vec<u8>> {
    let total = chunks.first()?.total;
    if chunks.len() != total as usize {
        return None;
    }

    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.sequence);

    for (i, chunk) in ordered.iter().enumerate() {
        if chunk.sequence as usize != i || chunk.total != total {
            return None;
        }
    }

    let size: usize = ordered.iter().map(|c| c.data.len()).sum();
    let mut data = Vec::with_capacity(size);
    for chunk in ordered {
        data.extend_from_slice(&chunk.data);
    }

    Some(data)
}
