//! Error types for the link core.
//!
//! Every decode path returns a structured error instead of panicking. Each
//! error is scoped to the unit being processed (byte frame, packet, chunk set,
//! FEC block) so the caller can decide whether to ask for a retransmission.
//!
//! Outcomes that are expected and recoverable are NOT errors here:
//! - an empty calibration run falls back to a default threshold
//! - an incomplete chunk set reassembles to `None`
//! - data that does not shrink is sent uncompressed

use thiserror::Error;

/// Top-level error type for all operations in the link core.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: reading/writing bits, parsing bit strings
/// - Parity: per-byte parity frames
/// - Packet: framing and integrity checking
/// - Chunk: chunk splitting and chunk headers
/// - Compression: LZ77 token streams
/// - FEC: parity-shard correction
/// - Envelope: payload mode prefix
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., reading past end of stream)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Parity frame failed validation
    #[error("parity error: {0}")]
    Parity(#[from] ParityError),

    /// Packet could not be framed or parsed
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// Chunking or chunk header error
    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),

    /// Compressed stream is malformed
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Forward error correction failed
    #[error("FEC error: {0}")]
    Fec(#[from] FecError),

    /// Payload mode envelope is malformed
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Bit-level I/O errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitIoError {
    /// Attempted to read more bits than available
    #[error("insufficient bits: requested {requested}, available {available}")]
    InsufficientBits { requested: usize, available: usize },

    /// Invalid bit count (more than 64 bits in one call)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),

    /// Bit string contains something other than '0' or '1'
    #[error("invalid bit character {found:?} at position {position}")]
    InvalidCharacter { position: usize, found: char },
}

/// Per-byte parity errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParityError {
    /// A 9-bit frame had an odd number of set bits
    #[error("parity mismatch in frame {frame_index}")]
    Mismatch { frame_index: usize },

    /// Input is not a whole number of 9-bit frames
    #[error("bit count {bits} is not a multiple of the 9-bit frame size")]
    PartialFrame { bits: usize },

    /// Input to the parity coder is not byte aligned
    #[error("bit count {bits} is not byte aligned")]
    Unaligned { bits: usize },
}

/// Packet framing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// No START sentinel anywhere in the received bits
    #[error("start frame not found")]
    FrameNotFound,

    /// Received bits end inside a fixed-width field
    #[error("truncated packet: {field} needs {required} bits, {available} available")]
    Truncated {
        field: &'static str,
        required: usize,
        available: usize,
    },

    /// LENGTH field claims more payload than the stream can hold
    #[error("length {length} exceeds received stream ({available_bits} bits left)")]
    LengthExceedsStream { length: u16, available_bits: usize },

    /// CRC16 over the payload doesn't match the transmitted checksum
    #[error("checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Byte after the checksum is not the END sentinel
    #[error("invalid end frame: {found:#04x}")]
    InvalidEndFrame { found: u8 },

    /// Payload cannot be described by the 16-bit LENGTH field
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Chunking errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    /// Chunk size of zero can never make progress
    #[error("max chunk size must be at least 1 byte")]
    ZeroChunkSize,

    /// Sequence numbers are 16-bit on the wire
    #[error("{count} chunks exceed maximum {max}")]
    TooManyChunks { count: usize, max: usize },

    /// Chunked packet payload too short for the chunk header
    #[error("chunk header too short: need {required} bytes, got {actual}")]
    HeaderTooShort { required: usize, actual: usize },

    /// sequence >= total
    #[error("sequence {sequence} >= total {total}")]
    InvalidSequence { sequence: u16, total: u16 },

    /// Different chunks of one payload claim different totals
    #[error("total chunk count mismatch: expected {expected}, got {actual}")]
    TotalMismatch { expected: u16, actual: u16 },
}

/// LZ77 stream errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompressionError {
    /// Token cut off before all of its fields were read
    #[error("truncated token at bit {position}")]
    TruncatedToken { position: usize },

    /// Match refers to data before the start of the output
    #[error("match distance {distance} exceeds decoded length {available}")]
    InvalidDistance { distance: u16, available: usize },
}

/// Parity-shard FEC errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FecError {
    /// Shard counts must both be non-zero
    #[error("invalid shard configuration: {data_shards} data, {parity_shards} parity")]
    InvalidConfig {
        data_shards: usize,
        parity_shards: usize,
    },

    /// Encoded block shorter than its parity trailer
    #[error("block of {len} bytes cannot hold {parity_shards} parity bytes")]
    BlockTooShort { len: usize, parity_shards: usize },

    /// More positions needed patching than the shard budget allows
    #[error("uncorrectable block: {corrections} corrections exceed budget {budget}")]
    Uncorrectable { corrections: usize, budget: usize },
}

/// Payload mode envelope errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Payload shorter than the 2-bit mode tag
    #[error("payload too short for mode tag")]
    MissingTag,

    /// Mode tag contains non-binary characters
    #[error("invalid mode tag {0:?}")]
    InvalidTag(String),

    /// Decoded payload bytes are not UTF-8
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
