//! Per-byte even parity.
//!
//! Each byte travels as a 9-bit frame: 8 data bits MSB-first followed by one
//! parity bit chosen so the frame holds an even number of `1`s. A frame that
//! fails the check signals the receiver to request a retransmission.
//!
//! # Bit error rate
//!
//! Parity detects but does not locate errors, so the BER estimate counts
//! every failed frame as 9 bit errors. This is a coarse upper-end proxy, not
//! an exact count.

use crate::bitio::{BitReader, BitStream, BitWriter};
use crate::error::{ParityError, Result};

/// Bits per parity frame.
pub const FRAME_BITS: usize = 9;

/// Bit errors charged to each failed frame by the BER estimate.
pub const BIT_ERRORS_PER_FAILURE: usize = 9;

/// The bit that makes the count of `1`s in `bits` plus itself even.
pub fn calculate_parity_bit(bits: &[bool]) -> bool {
    bits.iter().filter(|&&b| b).count() % 2 == 1
}

/// True iff `frame` is exactly 9 bits with an even count of `1`s.
pub fn validate_parity(frame: &[bool]) -> bool {
    frame.len() == FRAME_BITS && frame.iter().filter(|&&b| b).count() % 2 == 0
}

/// Estimated bit error rate from failed frames over observed bits.
pub fn estimate_bit_error_rate(failed_frames: usize, total_bits: usize) -> f64 {
    if total_bits == 0 {
        return 0.0;
    }
    (failed_frames * BIT_ERRORS_PER_FAILURE) as f64 / total_bits as f64
}

/// Encode bytes as consecutive 9-bit parity frames.
pub fn encode_with_parity(bytes: &[u8]) -> BitStream {
    let mut writer = BitWriter::with_capacity(bytes.len() * FRAME_BITS);
    for &byte in bytes {
        writer.write_byte(byte);
        writer.write_bit(byte.count_ones() % 2 == 1);
    }
    writer.finish()
}

/// Result of decoding a run of parity frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ParityDecode {
    /// Data byte of every frame, including frames that failed the check
    pub bytes: Vec<u8>,
    /// Indices of frames with odd parity
    pub failed_frames: Vec<usize>,
    /// BER estimate over the decoded bits
    pub bit_error_rate: f64,
}

impl ParityDecode {
    /// True if every frame passed.
    pub fn is_clean(&self) -> bool {
        self.failed_frames.is_empty()
    }

    /// The bytes, or the first parity failure.
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self.failed_frames.first() {
            Some(&frame_index) => Err(ParityError::Mismatch { frame_index }.into()),
            None => Ok(self.bytes),
        }
    }
}

/// Decode consecutive 9-bit parity frames.
///
/// Frames that fail the check are still decoded and reported, so the caller
/// decides whether to use them.
///
/// # Errors
/// `ParityError::PartialFrame` if `bits` is not a multiple of 9.
pub fn decode_with_parity(bits: &[bool]) -> Result<ParityDecode> {
    if bits.len() % FRAME_BITS != 0 {
        return Err(ParityError::PartialFrame { bits: bits.len() }.into());
    }

    let mut bytes = Vec::with_capacity(bits.len() / FRAME_BITS);
    let mut failed_frames = Vec::new();

    for (index, frame) in bits.chunks_exact(FRAME_BITS).enumerate() {
        if !validate_parity(frame) {
            failed_frames.push(index);
        }
        let mut reader = BitReader::new(&frame[..8]);
        bytes.push(reader.read_byte()?);
    }

    let bit_error_rate = estimate_bit_error_rate(failed_frames.len(), bits.len());

    Ok(ParityDecode {
        bytes,
        failed_frames,
        bit_error_rate,
    })
}

/// Apply parity line coding to a byte-aligned bit stream.
///
/// # Errors
/// `ParityError::Unaligned` if the stream length is not a multiple of 8.
pub fn encode_bits_with_parity(bits: &BitStream) -> Result<BitStream> {
    if bits.len() % 8 != 0 {
        return Err(ParityError::Unaligned { bits: bits.len() }.into());
    }
    Ok(encode_with_parity(&bits.to_bytes()))
}

/// Strip parity line coding, returning the decoded stream and the report.
pub fn decode_bits_with_parity(bits: &[bool]) -> Result<(BitStream, ParityDecode)> {
    let decoded = decode_with_parity(bits)?;
    Ok((BitStream::from_bytes(&decoded.bytes), decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn bits(s: &str) -> BitStream {
        s.parse().unwrap()
    }

    #[test]
    fn test_parity_bit() {
        assert!(!calculate_parity_bit(&bits("00000000")));
        assert!(calculate_parity_bit(&bits("00000001")));
        assert!(!calculate_parity_bit(&bits("11000000")));
        assert!(calculate_parity_bit(&bits("01001001")));
    }

    #[test]
    fn test_validate_parity() {
        assert!(validate_parity(&bits("000000000")));
        assert!(validate_parity(&bits("110000000")));
        assert!(!validate_parity(&bits("100000000")));
        // Wrong length is invalid regardless of ones
        assert!(!validate_parity(&bits("00000000")));
        assert!(!validate_parity(&bits("0000000000")));
        assert!(!validate_parity(&[]));
    }

    #[test]
    fn test_encode_frames() {
        // 'H' = 0x48 has two set bits -> parity 0
        assert_eq!(encode_with_parity(b"H").to_string(), "010010000");
        // 0x07 has three set bits -> parity 1
        assert_eq!(encode_with_parity(&[0x07]).to_string(), "000001111");
    }

    #[test]
    fn test_decode_clean() {
        let encoded = encode_with_parity(b"HELLO");
        assert_eq!(encoded.len(), 45);

        let decoded = decode_with_parity(&encoded).unwrap();
        assert!(decoded.is_clean());
        assert_eq!(decoded.bit_error_rate, 0.0);
        assert_eq!(decoded.into_result().unwrap(), b"HELLO");
    }

    #[test]
    fn test_decode_reports_failed_frame() {
        let mut raw = encode_with_parity(b"HELLO").into_inner();
        raw[2 * FRAME_BITS + 3] = !raw[2 * FRAME_BITS + 3];

        let decoded = decode_with_parity(&raw).unwrap();
        assert_eq!(decoded.failed_frames, vec![2]);
        assert_eq!(decoded.bit_error_rate, 9.0 / 45.0);
        assert!(matches!(
            decoded.into_result(),
            Err(Error::Parity(ParityError::Mismatch { frame_index: 2 }))
        ));
    }

    #[test]
    fn test_partial_frame() {
        let result = decode_with_parity(&bits("0000000001"));
        assert!(matches!(
            result,
            Err(Error::Parity(ParityError::PartialFrame { bits: 10 }))
        ));
    }

    #[test]
    fn test_bit_error_rate() {
        assert_eq!(estimate_bit_error_rate(0, 0), 0.0);
        assert_eq!(estimate_bit_error_rate(1, 90), 0.1);
    }

    #[test]
    fn test_line_coding_round_trip() {
        let stream = BitStream::from_bytes(&[0xFF, 0x01, 0x00]);
        let coded = encode_bits_with_parity(&stream).unwrap();
        assert_eq!(coded.len(), 27);

        let (decoded, report) = decode_bits_with_parity(&coded).unwrap();
        assert!(report.is_clean());
        assert_eq!(decoded, stream);

        assert!(encode_bits_with_parity(&bits("101")).is_err());
    }
}
