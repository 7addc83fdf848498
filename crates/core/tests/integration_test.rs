//! Integration tests for the full link pipeline.
//!
//! These tests verify end-to-end behavior: payload -> encode -> optical
//! channel -> calibrated sampling -> decode, with verification that the
//! output matches the input.

use vlc_link_core::{
    calibration::{Calibrator, Threshold, DEFAULT_MARGIN},
    channel::{ChannelConfig, OpticalChannel},
    envelope::PayloadMode,
    error::{Error, PacketError},
    fec::FecConfig,
    link::{decode_payload, encode_payload, LinkConfig, Receiver},
    metrics::LinkMetrics,
    packet::{create_packet, parse_packet, PacketFlags, PacketStream, PacketType},
};

fn calibrate(channel: &mut OpticalChannel) -> Threshold {
    let mut calibrator = Calibrator::new();
    calibrator.begin();
    for sample in channel.ambient_samples(32) {
        calibrator.add_sample(sample);
    }
    calibrator.finish(DEFAULT_MARGIN)
}

/// Send every packet through the channel and feed the receiver.
fn transfer(payload: &str, link: &LinkConfig, channel: ChannelConfig) -> Option<String> {
    let mut channel = OpticalChannel::new(channel).expect("valid channel");
    let threshold = calibrate(&mut channel);

    let tx = encode_payload(PayloadMode::Legacy, payload, PacketType::TEXT, PacketFlags::empty(), link)
        .expect("encoding failed");
    let mut receiver = Receiver::new(link.clone()).expect("valid link config");

    let mut result = None;
    for packet in tx.packets() {
        let bits = channel.propagate(packet, &threshold);
        if let Some(rx) = receiver.push_bits(&bits).expect("decoding failed") {
            result = Some(rx.payload);
        }
    }
    result
}

#[test]
fn test_hello_wire_format() {
    let bits = create_packet(PacketType::TEXT, b"HELLO", PacketFlags::empty()).unwrap();
    let expected = concat!(
        "11111111",
        "00000001",
        "00000000",
        "0000000000000101",
        "01001000",
        "01000101",
        "01001100",
        "01001100",
        "01001111",
        "0100100111010110",
        "00000000",
    );
    assert_eq!(bits.to_string(), expected);

    let packet = parse_packet(&bits).unwrap();
    assert_eq!(packet.packet_type.to_bit_string(), "00000001");
    assert!(packet.flags.is_empty());
    assert_eq!(packet.payload_str(), Some("HELLO"));
}

#[test]
fn test_short_message_over_noisy_channel() {
    let received = transfer("HELLO", &LinkConfig::default(), ChannelConfig::default_with_seed(42));
    assert_eq!(received.as_deref(), Some("HELLO"));
}

#[test]
fn test_large_compressible_message() {
    let payload = "The quick brown fox jumps over the lazy dog. ".repeat(40);
    let link = LinkConfig::default();

    let tx = encode_payload(PayloadMode::Legacy, &payload, PacketType::TEXT, PacketFlags::empty(), &link).unwrap();
    assert!(tx.flags().contains(PacketFlags::COMPRESSED));

    let received = transfer(&payload, &link, ChannelConfig::default_with_seed(7));
    assert_eq!(received.as_deref(), Some(payload.as_str()));
}

#[test]
fn test_chunked_message_with_fec_and_parity() {
    let payload: String = (0..600).map(|i| char::from(b'a' + (i * 7 % 26) as u8)).collect();
    let link = LinkConfig {
        compression: false,
        fec: Some(FecConfig::default()),
        max_chunk_size: 128,
        parity: true,
        ..LinkConfig::default()
    };

    let tx = encode_payload(PayloadMode::Legacy, &payload, PacketType::TEXT, PacketFlags::empty(), &link).unwrap();
    // 602 enveloped + 2 parity bytes in 128-byte chunks
    assert_eq!(tx.packet_count(), 5);

    let received = transfer(&payload, &link, ChannelConfig::default_with_seed(99));
    assert_eq!(received.as_deref(), Some(payload.as_str()));
}

#[test]
fn test_bit_flip_detected_by_crc() {
    let link = LinkConfig::default();
    let tx = encode_payload(PayloadMode::Legacy, "integrity", PacketType::TEXT, PacketFlags::empty(), &link).unwrap();

    let mut bits = tx.to_bit_stream().into_inner();
    // First payload bit, after the 40-bit header
    bits[40] = !bits[40];

    let mut metrics = LinkMetrics::new();
    let err = decode_payload(&bits, &link).unwrap_err();
    assert!(matches!(err, Error::Packet(PacketError::ChecksumMismatch { .. })));

    metrics.record_error(&err);
    assert_eq!(metrics.checksum_failures, 1);
}

#[test]
fn test_packets_found_amid_idle_bits() {
    let first = create_packet(PacketType::TEXT, b"one", PacketFlags::empty()).unwrap();
    let second = create_packet(PacketType::ACK, b"", PacketFlags::empty()).unwrap();

    let mut stream = "0000".parse::<vlc_link_core::bitio::BitStream>().unwrap();
    stream.extend_from_stream(&first);
    stream.extend_from_stream(&"000".parse().unwrap());
    stream.extend_from_stream(&second);

    let packets: Vec<_> = PacketStream::new(&stream).collect::<Result<_, _>>().unwrap();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].payload, b"one");
    assert_eq!(packets[1].packet_type, PacketType::ACK);
}

#[test]
fn test_uncalibrated_receiver_uses_default_threshold() {
    let mut calibrator = Calibrator::new();
    let threshold = calibrator.finish(DEFAULT_MARGIN);
    assert!(threshold.is_default());
    assert_eq!(threshold.value, 128.0);

    // Default threshold still separates 60 from 180
    let mut channel = OpticalChannel::new(ChannelConfig::perfect(5)).unwrap();
    let link = LinkConfig::default();
    let tx = encode_payload(PayloadMode::Auth, "token", PacketType::AUTH, PacketFlags::empty(), &link).unwrap();
    let bits = channel.propagate(&tx.to_bit_stream(), &threshold);

    let rx = decode_payload(&bits, &link).unwrap().unwrap();
    assert_eq!(rx.mode, PayloadMode::Auth);
    assert_eq!(rx.payload, "token");
}

#[test]
fn test_metrics_for_clean_transfer() {
    let link = LinkConfig::default();
    let mut channel = OpticalChannel::new(ChannelConfig::default_with_seed(3)).unwrap();
    let threshold = calibrate(&mut channel);

    let tx = encode_payload(PayloadMode::Config, "ref:42", PacketType::CONFIG, PacketFlags::empty(), &link).unwrap();
    let mut metrics = LinkMetrics::new();
    metrics.record_transmission(&tx);

    let sent = tx.to_bit_stream();
    let bits = channel.propagate(&sent, &threshold);
    metrics.record_bits(&sent, &bits);

    let rx = decode_payload(&bits, &link).unwrap().unwrap();
    metrics.record_received(&rx);
    metrics.complete();

    assert_eq!(metrics.bit_errors, 0);
    assert_eq!(metrics.payload_bytes, metrics.output_bytes);
    assert!(metrics.export_text().contains("packets_sent=1"));
}
