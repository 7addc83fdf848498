//! vlc-link-core: link and encoding core for visible-light data transfer
//!
//! This library turns application payloads into bit streams suitable for
//! on-off keying an LED, and turns camera brightness samples back into
//! payloads:
//! - Calibrates a brightness threshold against ambient light
//! - Optionally compresses payloads with LZ77
//! - Optionally protects them with parity-shard FEC
//! - Splits large payloads into sequenced chunks
//! - Frames each chunk as a CRC-16 protected packet
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Low-level bit reading/writing
//! - `calibration`: Ambient threshold and brightness-to-bit sampling
//! - `parity`: 9-bit even-parity byte frames and BER estimate
//! - `crc`: CRC-16/CCITT-FALSE
//! - `packet`: Packet format, parsing, stream scanning
//! - `chunk` / `reassembly`: Payload chunking and chunk collection
//! - `lz77`: Bit-packed LZ77 codec
//! - `fec`: Parity-shard forward error correction
//! - `envelope`: 2-bit payload mode tag
//! - `link`: The full encode/decode pipeline
//! - `channel`: Seeded optical channel simulator
//! - `metrics`: Observable link behavior
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **No globals**: Calibration and reassembly state are caller-owned values
//! - **Deterministic**: Seeded randomness makes simulated runs reproducible

pub mod bitio;
pub mod calibration;
pub mod channel;
pub mod chunk;
pub mod crc;
pub mod envelope;
pub mod error;
pub mod fec;
pub mod link;
pub mod lz77;
pub mod metrics;
pub mod packet;
pub mod parity;
pub mod reassembly;

// Re-export commonly used types
pub use error::{Error, Result};
pub use link::{decode_payload, encode_payload, LinkConfig, Received, Transmission};
