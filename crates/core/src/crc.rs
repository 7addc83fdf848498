//! CRC-16 over packet payloads.
//!
//! Parameters: polynomial 0x1021, initial register 0xFFFF, MSB-first, no
//! reflection, no final XOR (the CRC-16/IBM-3740 set, often called
//! CCITT-FALSE). Only payload bytes are covered; framing fields never are.

use crc::{Crc, CRC_16_IBM_3740};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// CRC16 of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// True if `bytes` checksum to `expected`.
pub fn verify(bytes: &[u8], expected: u16) -> bool {
    crc16(bytes) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_hello() {
        assert_eq!(crc16(b"HELLO"), 0x49D6);
        assert!(verify(b"HELLO", 0x49D6));
        assert!(!verify(b"HELLo", 0x49D6));
    }

    #[test]
    fn test_empty_is_initial_register() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_single_bit_flips_detected() {
        let payload = b"visible light".to_vec();
        let reference = crc16(&payload);

        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut corrupted = payload.clone();
                corrupted[byte] ^= 1 << bit;
                assert_ne!(crc16(&corrupted), reference, "byte {byte} bit {bit}");
            }
        }
    }
}
