//! Parity-shard forward error correction.
//!
//! A lightweight XOR scheme kept for wire compatibility with deployed
//! transmitters. It is NOT Reed-Solomon: there is no GF(256) arithmetic and no
//! guarantee of correcting arbitrary or burst errors.
//!
//! # Encoding
//!
//! Parity byte `j` is the XOR over every data byte of `byte ^ (j + 1)`. The
//! block goes on the wire as `data || parity`.
//!
//! # Decoding
//!
//! For each shard the parity is recomputed over the current data. A nonzero
//! delta is patched into position `delta % data_len` and counted. The block is
//! accepted only when the count stays within `parity_shards / 2`.
//!
//! A single corrupted data byte always brings the parity back in line after
//! one patch, but the patch lands on the corrupted byte only when the delta
//! happens to point there. Callers relying on content must still check the
//! packet CRC or an application-level digest.

use crate::error::{FecError, Result};
use tracing::{debug, warn};

/// Default number of data shards.
pub const DEFAULT_DATA_SHARDS: usize = 4;

/// Default number of parity shards.
pub const DEFAULT_PARITY_SHARDS: usize = 2;

/// Shard indices are folded in as `j + 1`, which must fit a byte.
pub const MAX_PARITY_SHARDS: usize = 255;

/// Shard counts for the FEC layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FecConfig {
    /// Data shards per block; carried for configuration compatibility
    pub data_shards: usize,
    /// Parity bytes appended to each block
    pub parity_shards: usize,
}

impl FecConfig {
    /// Create a validated configuration.
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self> {
        let config = Self {
            data_shards,
            parity_shards,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `FecError::InvalidConfig` for zero shards or too many parity shards.
    pub fn validate(&self) -> Result<()> {
        if self.data_shards == 0 || self.parity_shards == 0 || self.parity_shards > MAX_PARITY_SHARDS {
            return Err(FecError::InvalidConfig {
                data_shards: self.data_shards,
                parity_shards: self.parity_shards,
            }
            .into());
        }
        Ok(())
    }

    /// Most corrections a block may need and still be accepted.
    pub fn correction_budget(&self) -> usize {
        self.parity_shards / 2
    }
}

impl Default for FecConfig {
    fn default() -> Self {
        Self {
            data_shards: DEFAULT_DATA_SHARDS,
            parity_shards: DEFAULT_PARITY_SHARDS,
        }
    }
}

/// Data bytes with their parity trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FecBlock {
    pub data: Vec<u8>,
    pub parity: Vec<u8>,
}

impl FecBlock {
    /// Wire form: `data || parity`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() + self.parity.len());
        bytes.extend_from_slice(&self.data);
        bytes.extend_from_slice(&self.parity);
        bytes
    }

    /// Split a received block into data and its `parity_shards` trailer.
    ///
    /// # Errors
    /// `FecError::BlockTooShort` if the block can't hold the trailer.
    pub fn from_bytes(bytes: &[u8], parity_shards: usize) -> Result<Self> {
        if bytes.len() < parity_shards {
            return Err(FecError::BlockTooShort {
                len: bytes.len(),
                parity_shards,
            }
            .into());
        }
        let (data, parity) = bytes.split_at(bytes.len() - parity_shards);
        Ok(Self {
            data: data.to_vec(),
            parity: parity.to_vec(),
        })
    }
}

/// Parity byte for shard `shard`.
fn fold(data: &[u8], shard: usize) -> u8 {
    let key = (shard + 1) as u8;
    data.iter().fold(0u8, |acc, &byte| acc ^ byte ^ key)
}

/// Compute `parity_shards` parity bytes over `data`.
pub fn compute_parity(data: &[u8], parity_shards: usize) -> Vec<u8> {
    (0..parity_shards).map(|shard| fold(data, shard)).collect()
}

/// Protect `data` with parity shards.
pub fn fec_encode(data: &[u8], config: &FecConfig) -> Result<FecBlock> {
    config.validate()?;
    Ok(FecBlock {
        data: data.to_vec(),
        parity: compute_parity(data, config.parity_shards),
    })
}

/// A block that passed decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FecDecoded {
    pub data: Vec<u8>,
    /// Positions patched while decoding
    pub corrections: usize,
}

/// Check and, within budget, patch a received block.
///
/// # Errors
/// - `FecError::InvalidConfig` for a bad configuration
/// - `FecError::BlockTooShort` if the parity trailer is incomplete
/// - `FecError::Uncorrectable` if more patches were needed than the budget
pub fn fec_decode(block: &FecBlock, config: &FecConfig) -> Result<FecDecoded> {
    config.validate()?;
    if block.parity.len() < config.parity_shards {
        return Err(FecError::BlockTooShort {
            len: block.data.len() + block.parity.len(),
            parity_shards: config.parity_shards,
        }
        .into());
    }

    let mut data = block.data.clone();
    let mut corrections = 0;

    for shard in 0..config.parity_shards {
        let delta = fold(&data, shard) ^ block.parity[shard];
        if delta == 0 {
            continue;
        }

        corrections += 1;
        if !data.is_empty() {
            let position = delta as usize % data.len();
            data[position] ^= delta;
            debug!(shard, position, delta, "Patched FEC block");
        }
    }

    let budget = config.correction_budget();
    if corrections > budget {
        warn!(corrections, budget, "FEC block uncorrectable");
        return Err(FecError::Uncorrectable { corrections, budget }.into());
    }

    Ok(FecDecoded { data, corrections })
}
