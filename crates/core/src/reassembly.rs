//! Chunk collection for a single in-flight payload.
//!
//! Chunks of one payload arrive as separate packets, possibly out of order
//! and possibly repeated after retransmission. `ChunkBuffer` collects them
//! and reports which sequences are still missing, so the session layer knows
//! what to ask for.
//!
//! # Design
//!
//! - **Per-payload state**: one buffer per logical transmission
//! - **Duplicates**: an exact repeat of a received chunk is ignored
//! - **Completion**: delegated to [`reassemble_chunks`]
//! - **No timers**: expiry and retry policy belong to the caller
//!
//! # Thread Safety
//!
//! Plain owned data with `&mut self` mutation; share across threads behind
//! the caller's own synchronization if needed.

use crate::chunk::{reassemble_chunks, Chunk};
use crate::error::{ChunkError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Accumulates chunks until a payload is complete.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuffer {
    /// Declared chunk count, fixed by the first chunk seen
    total: Option<u16>,

    /// Chunks received so far, keyed by sequence
    chunks: BTreeMap<u16, Chunk>,

    /// Number of repeated chunks ignored
    duplicates: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk and report whether the payload is now complete.
    ///
    /// # Errors
    /// - `ChunkError::InvalidSequence` if sequence >= total
    /// - `ChunkError::TotalMismatch` if the chunk disagrees on the total
    pub fn insert(&mut self, chunk: Chunk) -> Result<bool> {
        if chunk.sequence >= chunk.total {
            return Err(ChunkError::InvalidSequence {
                sequence: chunk.sequence,
                total: chunk.total,
            }
            .into());
        }

        let total = *self.total.get_or_insert(chunk.total);
        if chunk.total != total {
            return Err(ChunkError::TotalMismatch {
                expected: total,
                actual: chunk.total,
            }
            .into());
        }

        if self.chunks.contains_key(&chunk.sequence) {
            self.duplicates += 1;
            debug!(sequence = chunk.sequence, total, "Ignoring duplicate chunk");
        } else {
            self.chunks.insert(chunk.sequence, chunk);
        }

        Ok(self.is_complete())
    }

    /// True once every sequence in `[0, total)` is present.
    pub fn is_complete(&self) -> bool {
        self.total
            .is_some_and(|total| self.chunks.len() == total as usize)
    }

    /// Sequences not yet received.
    ///
    /// Empty before the first chunk, since the total is unknown.
    pub fn missing(&self) -> Vec<u16> {
        match self.total {
            Some(total) => (0..total).filter(|s| !self.chunks.contains_key(s)).collect(),
            None => Vec::new(),
        }
    }

    /// Number of distinct chunks received.
    pub fn received_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of duplicate chunks ignored.
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    /// Declared total, once known.
    pub fn total(&self) -> Option<u16> {
        self.total
    }

    /// The reassembled payload, or `None` while incomplete.
    pub fn reassemble(&self) -> Option<Vec<u8>> {
        let chunks: Vec<Chunk> = self.chunks.values().cloned().collect();
        reassemble_chunks(&chunks)
    }

    /// Drop all state, ready for the next payload.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
