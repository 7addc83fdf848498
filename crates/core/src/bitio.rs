//! Bit streams and MSB-first bit readers/writers.
//!
//! The optical channel carries one bit per time slot, so everything above the
//! sampler works on a [`BitStream`]: an ordered sequence of bits that renders
//! to and parses from the `'0'`/`'1'` text form used at the physical boundary.
//!
//! [`BitWriter`] and [`BitReader`] serialize fixed-width fields MSB-first,
//! which is the bit order of every field on the wire (packet header, LZ77
//! tokens, parity frames).
//!
//! # Example
//! ```
//! use vlc_link_core::bitio::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3).unwrap();
//! writer.write_bits(0b11, 2).unwrap();
//! let bits = writer.finish();
//! assert_eq!(bits.to_string(), "10111");
//!
//! let mut reader = BitReader::new(&bits);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(2).unwrap(), 0b11);
//! ```

use crate::error::{BitIoError, Result};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// An ordered sequence of sampled or generated bits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitStream {
    bits: Vec<bool>,
}

impl BitStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// Create an empty stream with room for `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: Vec::with_capacity(capacity),
        }
    }

    /// Expand bytes MSB-first, 8 bits per byte.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut writer = BitWriter::with_capacity(bytes.len() * 8);
        writer.write_bytes(bytes);
        writer.finish()
    }

    /// Append a single bit.
    pub fn push(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Append every bit of `other`.
    pub fn extend_from_stream(&mut self, other: &BitStream) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Pack the bits MSB-first into bytes.
    ///
    /// A trailing partial byte is padded with zeros.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
            })
            .collect()
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Consume the stream, returning the raw bits.
    pub fn into_inner(self) -> Vec<bool> {
        self.bits
    }
}

impl Deref for BitStream {
    type Target = [bool];

    fn deref(&self) -> &[bool] {
        &self.bits
    }
}

impl From<Vec<bool>> for BitStream {
    fn from(bits: Vec<bool>) -> Self {
        Self { bits }
    }
}

impl From<&[bool]> for BitStream {
    fn from(bits: &[bool]) -> Self {
        Self {
            bits: bits.to_vec(),
        }
    }
}

impl FromIterator<bool> for BitStream {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for BitStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for BitStream {
    type Err = BitIoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.chars()
            .enumerate()
            .map(|(position, c)| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                found => Err(BitIoError::InvalidCharacter { position, found }),
            })
            .collect()
    }
}

/// Writes fixed-width fields MSB-first into a [`BitStream`].
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    stream: BitStream,
}

impl BitWriter {
    /// Create a new BitWriter with empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with room for `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stream: BitStream::with_capacity(capacity),
        }
    }

    /// Write the lowest `count` bits of `value`, most significant first.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidBitCount` if count > 64.
    pub fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        for shift in (0..count).rev() {
            self.stream.push((value >> shift) & 1 == 1);
        }

        Ok(())
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.stream.push(bit);
    }

    /// Write one byte, MSB first.
    pub fn write_byte(&mut self, byte: u8) {
        for shift in (0..8).rev() {
            self.stream.push((byte >> shift) & 1 == 1);
        }
    }

    /// Write a 16-bit big-endian field.
    pub fn write_u16(&mut self, value: u16) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte);
        }
    }

    /// Write every byte of `bytes`.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Total number of bits written.
    pub fn bit_len(&self) -> usize {
        self.stream.len()
    }

    /// Finish writing and return the stream.
    pub fn finish(self) -> BitStream {
        self.stream
    }
}

/// Reads fixed-width fields MSB-first from a bit slice.
///
/// # Invariants
/// - `position` never exceeds `bits.len()`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source bits
    bits: &'a [bool],
    /// Current bit position
    position: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit.
    pub fn new(bits: &'a [bool]) -> Self {
        Self { bits, position: 0 }
    }

    /// Create a reader positioned at `position` (clamped to the end).
    pub fn at(bits: &'a [bool], position: usize) -> Self {
        Self {
            bits,
            position: position.min(bits.len()),
        }
    }

    /// Read up to 64 bits, MSB first.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 64
    /// - `BitIoError::InsufficientBits` if not enough bits remain
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let available = self.bits_remaining();
        if count > available {
            return Err(BitIoError::InsufficientBits {
                requested: count,
                available,
            }
            .into());
        }

        let value = self.bits[self.position..self.position + count]
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit));
        self.position += count;

        Ok(value)
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Read an 8-bit field.
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Read a 16-bit big-endian field.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    /// Read `count` whole bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let required = count * 8;
        let available = self.bits_remaining();
        if required > available {
            return Err(BitIoError::InsufficientBits {
                requested: required,
                available,
            }
            .into());
        }

        (0..count).map(|_| self.read_byte()).collect()
    }

    /// Number of bits not yet read.
    pub fn bits_remaining(&self) -> usize {
        self.bits.len() - self.position
    }

    /// Current bit position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bits not yet read, without consuming them.
    pub fn remaining(&self) -> &'a [bool] {
        &self.bits[self.position..]
    }

    /// Check if every bit has been read.
    pub fn is_empty(&self) -> bool {
        self.position >= self.bits.len()
    }
}
