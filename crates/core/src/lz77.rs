//! LZ77 sliding-window compression.
//!
//! Data is turned into a sequence of tokens: a literal byte, or a back
//! reference copying `length` bytes starting `distance` bytes behind the
//! current output position. The search is an exhaustive scan of the window
//! (no hash chains); payloads on this link are small enough for that.
//!
//! # Token Format
//!
//! ```text
//! literal:  0 | byte (8)                       9 bits
//! match:    1 | length (8) | distance (12)    21 bits
//! ```
//!
//! Matches are at least [`MIN_MATCH`] bytes, at most [`MAX_MATCH`] bytes, and
//! reach back at most [`MAX_DISTANCE`] bytes. A match may overlap the bytes
//! it produces (length > distance), which encodes runs.
//!
//! # Byte Packing
//!
//! When tokens ride in a packet payload they are packed MSB-first into bytes
//! with zero padding. On unpacking, a tail of fewer than 9 zero bits is
//! padding; any other leftover is a truncated token.

use crate::bitio::{BitReader, BitStream, BitWriter};
use crate::error::{CompressionError, Result};
use tracing::debug;

/// Look-back window in bytes.
pub const WINDOW_SIZE: usize = 4096;

/// Lookahead buffer in bytes.
pub const LOOKAHEAD_SIZE: usize = 256;

/// Shortest back reference worth emitting.
pub const MIN_MATCH: usize = 3;

/// Longest back reference (8-bit length field).
pub const MAX_MATCH: usize = 255;

/// Farthest back reference (12-bit distance field).
pub const MAX_DISTANCE: usize = WINDOW_SIZE - 1;

/// Inputs shorter than this are never compressed.
pub const MIN_COMPRESS_LEN: usize = 100;

const LITERAL_BITS: usize = 9;
const MATCH_BITS: usize = 21;

/// One unit of the compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(u8),
    Match { length: u8, distance: u16 },
}

impl Token {
    /// Serialized size in bits.
    pub fn bit_len(&self) -> usize {
        match self {
            Token::Literal(_) => LITERAL_BITS,
            Token::Match { .. } => MATCH_BITS,
        }
    }
}

/// Tokenize `data` with a longest-match search over the window.
pub fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let window_start = pos.saturating_sub(MAX_DISTANCE);
        let max_len = MAX_MATCH.min(LOOKAHEAD_SIZE).min(data.len() - pos);

        let mut best_len = 0;
        let mut best_distance = 0;

        for candidate in window_start..pos {
            let mut len = 0;
            while len < max_len && data[candidate + len] == data[pos + len] {
                len += 1;
            }
            if len > best_len {
                best_len = len;
                best_distance = pos - candidate;
                if len == max_len {
                    break;
                }
            }
        }

        if best_len >= MIN_MATCH {
            tokens.push(Token::Match {
                length: best_len as u8,
                distance: best_distance as u16,
            });
            pos += best_len;
        } else {
            tokens.push(Token::Literal(data[pos]));
            pos += 1;
        }
    }

    tokens
}

/// Serialize tokens into their bit form.
pub fn serialize_tokens(tokens: &[Token]) -> BitStream {
    let capacity = tokens.iter().map(Token::bit_len).sum();
    let mut writer = BitWriter::with_capacity(capacity);

    for token in tokens {
        match *token {
            Token::Literal(byte) => {
                writer.write_bit(false);
                writer.write_byte(byte);
            }
            Token::Match { length, distance } => {
                writer.write_bit(true);
                writer.write_byte(length);
                // Distance never exceeds 12 bits by construction
                for shift in (0..12).rev() {
                    writer.write_bit((distance >> shift) & 1 == 1);
                }
            }
        }
    }

    writer.finish()
}

/// Parse a token stream that ends exactly on a token boundary.
///
/// # Errors
/// `CompressionError::TruncatedToken` if the bits end inside a token.
pub fn deserialize_tokens(bits: &[bool]) -> Result<Vec<Token>> {
    read_tokens(bits, false)
}

fn read_tokens(bits: &[bool], allow_padding: bool) -> Result<Vec<Token>> {
    let mut reader = BitReader::new(bits);
    let mut tokens = Vec::new();

    while !reader.is_empty() {
        let remaining = reader.remaining();
        if allow_padding && remaining.len() < LITERAL_BITS && remaining.iter().all(|&b| !b) {
            break;
        }

        let position = reader.position();
        let is_match = reader.read_bit()?;
        let needed = (if is_match { MATCH_BITS } else { LITERAL_BITS }) - 1;
        if reader.bits_remaining() < needed {
            return Err(CompressionError::TruncatedToken { position }.into());
        }

        if is_match {
            let length = reader.read_byte()?;
            let distance = reader.read_bits(12)? as u16;
            tokens.push(Token::Match { length, distance });
        } else {
            tokens.push(Token::Literal(reader.read_byte()?));
        }
    }

    Ok(tokens)
}

/// Replay tokens into the original bytes.
///
/// # Errors
/// `CompressionError::InvalidDistance` if a match reaches before the start of
/// the output (or has distance 0).
pub fn detokenize(tokens: &[Token]) -> Result<Vec<u8>> {
    let mut output = Vec::new();

    for token in tokens {
        match *token {
            Token::Literal(byte) => output.push(byte),
            Token::Match { length, distance } => {
                let distance_usize = distance as usize;
                if distance_usize == 0 || distance_usize > output.len() {
                    return Err(CompressionError::InvalidDistance {
                        distance,
                        available: output.len(),
                    }
                    .into());
                }
                let start = output.len() - distance_usize;
                // Byte at a time: the source may overlap what we are writing
                for i in 0..length as usize {
                    output.push(output[start + i]);
                }
            }
        }
    }

    Ok(output)
}

/// Compress to a bare token bit stream.
pub fn compress_to_bits(data: &[u8]) -> BitStream {
    serialize_tokens(&tokenize(data))
}

/// Decompress a bare token bit stream.
pub fn decompress_bits(bits: &[bool]) -> Result<Vec<u8>> {
    detokenize(&deserialize_tokens(bits)?)
}

/// Result of a compression attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compressed {
    /// Byte-packed token stream and its exact bit length
    Lz77 { packed: Vec<u8>, bit_len: usize },
    /// Input passed through: disabled, too short, or not smaller
    Raw(Vec<u8>),
}

impl Compressed {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Compressed::Lz77 { .. })
    }

    /// Size of the representation in bits.
    pub fn bit_len(&self) -> usize {
        match self {
            Compressed::Lz77 { bit_len, .. } => *bit_len,
            Compressed::Raw(data) => data.len() * 8,
        }
    }

    /// Bytes to transmit.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Compressed::Lz77 { packed, .. } => packed,
            Compressed::Raw(data) => data,
        }
    }
}

/// Compress `data` if enabled, long enough, and actually smaller.
///
/// The result never exceeds the 8-bits-per-byte baseline: when the token
/// stream is not strictly shorter, the input is returned as
/// [`Compressed::Raw`].
pub fn compress_data(data: &[u8], enable: bool) -> Compressed {
    if !enable || data.len() < MIN_COMPRESS_LEN {
        return Compressed::Raw(data.to_vec());
    }

    let bits = compress_to_bits(data);
    let baseline = data.len() * 8;

    if bits.len() >= baseline {
        debug!(
            original_bits = baseline,
            compressed_bits = bits.len(),
            "Compression not beneficial, sending raw"
        );
        return Compressed::Raw(data.to_vec());
    }

    debug!(
        original_bits = baseline,
        compressed_bits = bits.len(),
        "Compressed payload"
    );

    Compressed::Lz77 {
        packed: bits.to_bytes(),
        bit_len: bits.len(),
    }
}

/// Inverse of the packed form produced by [`compress_data`].
///
/// # Errors
/// Propagates truncated-token and invalid-distance errors.
pub fn decompress_data(packed: &[u8]) -> Result<Vec<u8>> {
    let bits = BitStream::from_bytes(packed);
    detokenize(&read_tokens(&bits, true)?)
}
