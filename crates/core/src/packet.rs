//! Packet framing and parsing.
//!
//! Every transmission unit on the optical link is one packet, serialized
//! MSB-first straight into the bit stream.
//!
//! # Packet Format
//!
//! ```text
//! +-------------------+
//! | START (8 bits)    |  0xFF sentinel
//! +-------------------+
//! | TYPE (8)          |  data type code
//! +-------------------+
//! | FLAGS (8)         |  PacketFlags bitmask
//! +-------------------+
//! | LENGTH (16)       |  payload byte count, big-endian
//! +-------------------+
//! | PAYLOAD           |  LENGTH * 8 bits
//! | (variable)        |
//! +-------------------+
//! | CHECKSUM (16)     |  CRC16 of the payload bytes only
//! +-------------------+
//! | END (8)           |  0x00 sentinel
//! +-------------------+
//! ```
//!
//! # Sentinels
//!
//! There is no bit stuffing. Payload bytes equal to START or END are never
//! escaped; the parser finds the first START and then trusts LENGTH to slice
//! the payload. A LENGTH that reaches past the received bits is rejected
//! immediately rather than misparsed.

use crate::bitio::{BitReader, BitStream, BitWriter};
use crate::crc::crc16;
use crate::error::{PacketError, Result};
use bitflags::bitflags;
use std::fmt;
use tracing::{debug, warn};

/// START sentinel byte.
pub const START_FRAME: u8 = 0xFF;

/// END sentinel byte.
pub const END_FRAME: u8 = 0x00;

/// Largest payload the 16-bit LENGTH field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Bits in START + TYPE + FLAGS + LENGTH.
pub const HEADER_BITS: usize = 40;

/// Bits in CHECKSUM + END.
pub const TRAILER_BITS: usize = 24;

/// Data type code carried in the TYPE field.
///
/// Any 8-bit value is accepted on the wire; the associated constants are the
/// codes the application layer assigns meaning to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(pub u8);

impl PacketType {
    pub const TEXT: Self = Self(0x01);
    pub const BINARY: Self = Self(0x02);
    pub const COMMAND: Self = Self(0x03);
    pub const AUTH: Self = Self(0x04);
    pub const CONFIG: Self = Self(0x05);
    pub const ACK: Self = Self(0x06);
    pub const NACK: Self = Self(0x07);

    /// The code as an 8-character bit string, e.g. `"00000001"`.
    pub fn to_bit_string(self) -> String {
        format!("{:08b}", self.0)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

bitflags! {
    /// FLAGS field bitmask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PacketFlags: u8 {
        /// Payload is an LZ77 token stream
        const COMPRESSED     = 0b0000_0001;
        /// Payload starts with a chunk header
        const CHUNKED        = 0b0000_0010;
        /// Payload encrypted by an upper layer
        const ENCRYPTED      = 0b0000_0100;
        const HIGH_PRIORITY  = 0b0000_1000;
        /// Sent again after a failed delivery
        const RETRANSMISSION = 0b0001_0000;
        /// Payload ends with parity-shard FEC bytes
        const FEC_ENABLED    = 0b0010_0000;
    }
}

/// A framed unit of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    pub flags: PacketFlags,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(packet_type: PacketType, flags: PacketFlags, payload: Vec<u8>) -> Self {
        Self {
            packet_type,
            flags,
            payload,
        }
    }

    /// Serialize this packet into wire bits.
    pub fn to_bits(&self) -> Result<BitStream> {
        create_packet(self.packet_type, &self.payload, self.flags)
    }

    /// Total serialized size in bits.
    pub fn bit_len(&self) -> usize {
        HEADER_BITS + self.payload.len() * 8 + TRAILER_BITS
    }

    /// Payload as text, if it is UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Frame `payload` into wire bits.
///
/// # Errors
/// `PacketError::PayloadTooLarge` if the payload exceeds [`MAX_PAYLOAD_LEN`].
pub fn create_packet(packet_type: PacketType, payload: &[u8], flags: PacketFlags) -> Result<BitStream> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(PacketError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        }
        .into());
    }

    let mut writer = BitWriter::with_capacity(HEADER_BITS + payload.len() * 8 + TRAILER_BITS);

    writer.write_byte(START_FRAME);
    writer.write_byte(packet_type.0);
    writer.write_byte(flags.bits());
    writer.write_u16(payload.len() as u16);
    writer.write_bytes(payload);
    writer.write_u16(crc16(payload));
    writer.write_byte(END_FRAME);

    debug!(
        packet_type = packet_type.0,
        flags = flags.bits(),
        payload_len = payload.len(),
        "Framed packet"
    );

    Ok(writer.finish())
}

/// Parse the first packet in `bits`.
///
/// # Errors
/// - `PacketError::FrameNotFound` if no START sentinel is present
/// - `PacketError::Truncated` / `LengthExceedsStream` if the bits end early
/// - `PacketError::ChecksumMismatch` if the payload CRC doesn't match
/// - `PacketError::InvalidEndFrame` if the END sentinel is wrong
pub fn parse_packet(bits: &[bool]) -> Result<Packet> {
    parse_packet_at(bits, 0).map(|(packet, _)| packet)
}

/// Parse the first packet starting at or after bit `offset`.
///
/// Returns the packet and the bit offset just past its END sentinel.
pub fn parse_packet_at(bits: &[bool], offset: usize) -> Result<(Packet, usize)> {
    let start = find_start(bits, offset).ok_or(PacketError::FrameNotFound)?;
    let mut reader = BitReader::at(bits, start + 8);

    let available = reader.bits_remaining();
    if available < HEADER_BITS - 8 {
        return Err(PacketError::Truncated {
            field: "header",
            required: HEADER_BITS - 8,
            available,
        }
        .into());
    }

    let packet_type = PacketType(reader.read_byte()?);
    let flags = PacketFlags::from_bits_retain(reader.read_byte()?);
    let length = reader.read_u16()?;

    let available_bits = reader.bits_remaining();
    if length as usize * 8 + TRAILER_BITS > available_bits {
        return Err(PacketError::LengthExceedsStream {
            length,
            available_bits,
        }
        .into());
    }

    let payload = reader.read_bytes(length as usize)?;

    let expected = reader.read_u16()?;
    let actual = crc16(&payload);
    if expected != actual {
        warn!(expected, actual, length, "Packet checksum mismatch");
        return Err(PacketError::ChecksumMismatch { expected, actual }.into());
    }

    let end = reader.read_byte()?;
    if end != END_FRAME {
        return Err(PacketError::InvalidEndFrame { found: end }.into());
    }

    debug!(
        packet_type = packet_type.0,
        flags = flags.bits(),
        payload_len = payload.len(),
        start,
        "Parsed packet"
    );

    Ok((
        Packet {
            packet_type,
            flags,
            payload,
        },
        reader.position(),
    ))
}

/// Position of the first 8-bit START match at or after `offset`.
fn find_start(bits: &[bool], offset: usize) -> Option<usize> {
    let search = bits.get(offset..)?;
    search
        .windows(8)
        .position(|window| window.iter().all(|&b| b))
        .map(|pos| offset + pos)
}

/// Iterator over back-to-back packets in one received buffer.
///
/// Stops after the first failure, yielding that error; a failed packet gives
/// no reliable position to resynchronize from.
#[derive(Debug, Clone)]
pub struct PacketStream<'a> {
    bits: &'a [bool],
    offset: usize,
    done: bool,
}

impl<'a> PacketStream<'a> {
    pub fn new(bits: &'a [bool]) -> Self {
        Self {
            bits,
            offset: 0,
            done: false,
        }
    }
}

impl Iterator for PacketStream<'_> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // Trailing bits without another START are idle line, not an error
        find_start(self.bits, self.offset)?;

        match parse_packet_at(self.bits, self.offset) {
            Ok((packet, next)) => {
                self.offset = next;
                Some(Ok(packet))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
