//! Property-based tests for the link codecs.
//!
//! ## Test Categories
//! 1. **Framing**: packets round-trip and CRC-16 catches single-bit errors
//! 2. **Parity**: frame validity is exactly "even number of ones"
//! 3. **Chunking**: reassembly inverts chunking, any gap yields `None`
//! 4. **LZ77**: lossless and never larger than the raw baseline
//! 5. **FEC**: clean blocks need no patching, one bad byte stays in budget
//! 6. **Pipeline**: any payload survives encode/decode under any config

use proptest::prelude::*;
use vlc_link_core::{
    calibration::calculate_threshold,
    chunk::{chunk_data, reassemble_chunks},
    crc::crc16,
    envelope::PayloadMode,
    fec::{fec_decode, fec_encode, FecConfig},
    link::{decode_payload, encode_payload, LinkConfig},
    lz77::{compress_data, decompress_data, detokenize, tokenize},
    packet::{create_packet, parse_packet, PacketFlags, PacketType},
    parity::{calculate_parity_bit, validate_parity},
};

// ─────────────────────────────────────────────────────────────────────────────
// Proptest Strategies
// ─────────────────────────────────────────────────────────────────────────────

fn payload_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Low-entropy bytes, so LZ77 finds matches.
fn repetitive_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abc ".to_vec()), 0..1200)
}

fn payload_mode() -> impl Strategy<Value = PayloadMode> {
    prop_oneof![
        Just(PayloadMode::Legacy),
        Just(PayloadMode::Auth),
        Just(PayloadMode::Config),
        Just(PayloadMode::Command),
    ]
}

fn link_config() -> impl Strategy<Value = LinkConfig> {
    (any::<bool>(), any::<bool>(), any::<bool>(), 1usize..=300).prop_map(
        |(compression, fec, parity, max_chunk_size)| LinkConfig {
            compression,
            fec: fec.then(FecConfig::default),
            max_chunk_size,
            parity,
            ..LinkConfig::default()
        },
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Framing
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_packet_round_trip(payload in payload_bytes(), packet_type in any::<u8>(), flags in any::<u8>()) {
        let flags = PacketFlags::from_bits_retain(flags);
        let bits = create_packet(PacketType(packet_type), &payload, flags).unwrap();
        prop_assert_eq!(bits.len(), 64 + payload.len() * 8);

        let packet = parse_packet(&bits).unwrap();
        prop_assert_eq!(packet.packet_type, PacketType(packet_type));
        prop_assert_eq!(packet.flags, flags);
        prop_assert_eq!(packet.payload, payload);
    }

    #[test]
    fn prop_crc_detects_single_bit_flip(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
    ) {
        let bit = index.index(payload.len() * 8);
        let mut corrupted = payload.clone();
        corrupted[bit / 8] ^= 0x80 >> (bit % 8);

        prop_assert_ne!(crc16(&payload), crc16(&corrupted));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parity
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_parity_frame_valid(byte_bits in prop::collection::vec(any::<bool>(), 8)) {
        let mut frame = byte_bits.clone();
        frame.push(calculate_parity_bit(&byte_bits));
        prop_assert!(validate_parity(&frame));
    }

    #[test]
    fn prop_parity_iff_even_ones(frame in prop::collection::vec(any::<bool>(), 0..12)) {
        let even = frame.iter().filter(|&&b| b).count() % 2 == 0;
        prop_assert_eq!(validate_parity(&frame), frame.len() == 9 && even);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chunking
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_chunk_reassemble(data in payload_bytes(), size in 1usize..=64) {
        let chunks = chunk_data(&data, PacketType::BINARY, size).unwrap();
        prop_assert!(chunks.iter().all(|c| c.data.len() <= size));

        let mut shuffled = chunks.clone();
        shuffled.reverse();
        prop_assert_eq!(reassemble_chunks(&shuffled), Some(data));
    }

    #[test]
    fn prop_chunk_gap_is_none(data in payload_bytes(), size in 1usize..=64, index in any::<prop::sample::Index>()) {
        let mut chunks = chunk_data(&data, PacketType::BINARY, size).unwrap();
        chunks.remove(index.index(chunks.len()));
        prop_assert_eq!(reassemble_chunks(&chunks), None);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LZ77
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_tokens_lossless(data in repetitive_bytes()) {
        prop_assert_eq!(detokenize(&tokenize(&data)).unwrap(), data);
    }

    #[test]
    fn prop_compress_lossless_and_bounded(data in prop_oneof![repetitive_bytes(), payload_bytes()]) {
        let compressed = compress_data(&data, true);
        prop_assert!(compressed.bit_len() <= data.len() * 8);

        let restored = if compressed.is_compressed() {
            decompress_data(&compressed.into_bytes()).unwrap()
        } else {
            compressed.into_bytes()
        };
        prop_assert_eq!(restored, data);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FEC
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_fec_clean_block(data in payload_bytes()) {
        let config = FecConfig::default();
        let block = fec_encode(&data, &config).unwrap();
        let decoded = fec_decode(&block, &config).unwrap();

        prop_assert_eq!(decoded.corrections, 0);
        prop_assert_eq!(decoded.data, data);
    }

    #[test]
    fn prop_fec_single_tampered_byte(
        data in prop::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let config = FecConfig::default();
        let mut block = fec_encode(&data, &config).unwrap();
        block.data[index.index(data.len())] ^= mask;

        let decoded = fec_decode(&block, &config).unwrap();
        prop_assert!(decoded.corrections >= 1);
        prop_assert!(decoded.corrections <= config.correction_budget());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Calibration
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_threshold_is_mean_plus_margin(samples in prop::collection::vec(0.0f64..255.0, 1..64), margin in 0.0f64..100.0) {
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        prop_assert!((calculate_threshold(&samples, margin) - (mean + margin)).abs() < 1e-9);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_link_round_trip(
        payload in "\\PC{0,400}",
        mode in payload_mode(),
        config in link_config(),
    ) {
        let tx = encode_payload(mode, &payload, PacketType::TEXT, PacketFlags::empty(), &config).unwrap();
        let rx = decode_payload(&tx.to_bit_stream(), &config).unwrap().unwrap();

        prop_assert_eq!(rx.mode, mode);
        prop_assert_eq!(rx.payload, payload);
        prop_assert_eq!(rx.fec_corrections, 0);
    }
}
