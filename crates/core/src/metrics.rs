//! Metrics collection and reporting for a link session.
//!
//! This module provides observable insights into link behavior:
//! - Payload size before and after compression
//! - Bit and packet counts on the optical channel
//! - Integrity failures (checksum, parity, FEC)
//! - Measured bit error rate and airtime
//!
//! # Thread Safety
//!
//! `LinkMetrics` is NOT thread-safe. For multi-threaded use, wrap in
//! `Arc<Mutex<LinkMetrics>>` or keep per-thread metrics and merge at the end.

use crate::error::{Error, FecError, PacketError, ParityError};
use crate::link::{Received, Transmission};
use std::time::{Duration, Instant};

/// Counters for one or more payload transfers.
#[derive(Debug, Clone)]
pub struct LinkMetrics {
    // === Timing ===
    /// When the session started
    pub start_time: Instant,

    /// When the session ended (set on completion)
    pub end_time: Option<Instant>,

    /// Simulated time on air
    pub airtime: Duration,

    // === Payload ===
    /// Enveloped payload bytes handed to the encoder
    pub payload_bytes: u64,

    /// Bytes after compression and FEC
    pub encoded_bytes: u64,

    /// Payload bytes delivered by the decoder
    pub output_bytes: u64,

    // === Channel ===
    /// Packets put on the channel
    pub packets_sent: u64,

    /// Packets that decoded into a payload
    pub packets_parsed: u64,

    /// Bits put on the channel
    pub bits_transmitted: u64,

    /// Bits sampled by the receiver
    pub bits_received: u64,

    /// Received bits that differ from those sent
    pub bit_errors: u64,

    // === Integrity ===
    /// Packets rejected by CRC-16
    pub checksum_failures: u64,

    /// Byte frames rejected by even parity
    pub parity_failures: u64,

    /// Positions patched by FEC
    pub fec_corrections: u64,

    /// Blocks FEC could not accept
    pub fec_failures: u64,

    /// Any other decode failure
    pub decode_failures: u64,
}

impl LinkMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            airtime: Duration::ZERO,
            payload_bytes: 0,
            encoded_bytes: 0,
            output_bytes: 0,
            packets_sent: 0,
            packets_parsed: 0,
            bits_transmitted: 0,
            bits_received: 0,
            bit_errors: 0,
            checksum_failures: 0,
            parity_failures: 0,
            fec_corrections: 0,
            fec_failures: 0,
            decode_failures: 0,
        }
    }

    /// Mark the session as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Wall-clock duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    pub fn record_transmission(&mut self, tx: &Transmission) {
        self.payload_bytes += tx.payload_len() as u64;
        self.encoded_bytes += tx.encoded_len() as u64;
        self.packets_sent += tx.packet_count() as u64;
        self.bits_transmitted += tx.bit_len() as u64;
        self.airtime += tx.airtime();
    }

    /// Compare what was sent with what was sampled.
    ///
    /// Bits past the shorter stream count as errors.
    pub fn record_bits(&mut self, sent: &[bool], received: &[bool]) {
        let differing = sent
            .iter()
            .zip(received)
            .filter(|(a, b)| a != b)
            .count();
        let unmatched = sent.len().abs_diff(received.len());

        self.bits_received += received.len() as u64;
        self.bit_errors += (differing + unmatched) as u64;
    }

    pub fn record_received(&mut self, rx: &Received) {
        // Two tag characters precede the payload on the wire
        self.output_bytes += (rx.payload.len() + 2) as u64;
        self.packets_parsed += rx.packets as u64;
        self.fec_corrections += rx.fec_corrections as u64;
    }

    /// Classify a decode failure.
    pub fn record_error(&mut self, error: &Error) {
        match error {
            Error::Packet(PacketError::ChecksumMismatch { .. }) => self.checksum_failures += 1,
            Error::Parity(ParityError::Mismatch { .. }) => self.parity_failures += 1,
            Error::Fec(FecError::Uncorrectable { .. }) => self.fec_failures += 1,
            _ => self.decode_failures += 1,
        }
    }

    /// Encoded / payload bytes; 0.0 if nothing was sent.
    pub fn compression_ratio(&self) -> f64 {
        if self.payload_bytes == 0 {
            0.0
        } else {
            self.encoded_bytes as f64 / self.payload_bytes as f64
        }
    }

    /// Measured bit error rate; 0.0 if nothing was received.
    pub fn bit_error_rate(&self) -> f64 {
        if self.bits_received == 0 {
            0.0
        } else {
            self.bit_errors as f64 / self.bits_received as f64
        }
    }

    /// Payload bits per second of airtime.
    pub fn goodput_bps(&self) -> f64 {
        let secs = self.airtime.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            (self.output_bytes * 8) as f64 / secs
        }
    }

    fn failures(&self) -> u64 {
        self.checksum_failures + self.parity_failures + self.fec_failures + self.decode_failures
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Link Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!("Airtime: {:.1} s", self.airtime.as_secs_f64());
        println!();

        println!("=== Payload ===");
        println!("Input:   {} bytes", self.payload_bytes);
        println!("Encoded: {} bytes", self.encoded_bytes);
        println!("Output:  {} bytes", self.output_bytes);
        println!("Ratio: {:.1}%", self.compression_ratio() * 100.0);
        println!();

        println!("=== Channel ===");
        println!("Packets sent: {}", self.packets_sent);
        println!("Packets parsed: {}", self.packets_parsed);
        println!("Bits transmitted: {}", self.bits_transmitted);
        println!("Bits received: {}", self.bits_received);
        println!("Bit errors: {} (BER {:.4})", self.bit_errors, self.bit_error_rate());
        println!();

        println!("=== Integrity ===");
        println!("Checksum failures: {}", self.checksum_failures);
        println!("Parity failures: {}", self.parity_failures);
        println!("FEC corrections: {}", self.fec_corrections);
        println!("FEC failures: {}", self.fec_failures);
        println!("Other failures: {}", self.decode_failures);
        println!();

        println!("=== Performance ===");
        println!("Goodput: {:.2} bit/s", self.goodput_bps());
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.failures() == 0 && self.payload_bytes == self.output_bytes {
            println!("✓ Transfer completed successfully");
            println!("  {} bytes in {:.1} s of airtime", self.output_bytes, self.airtime.as_secs_f64());
        } else if self.checksum_failures > 0 {
            println!("✗ Transfer failed: {} packets failed CRC", self.checksum_failures);
        } else if self.parity_failures > 0 {
            println!("✗ Transfer failed: {} parity failures", self.parity_failures);
        } else if self.failures() > 0 {
            println!("✗ Transfer failed: {} decode failures", self.failures());
        } else {
            println!("✗ Transfer incomplete ({} of {} bytes)", self.output_bytes, self.payload_bytes);
        }
    }

    /// Export metrics as `key=value` lines.
    pub fn export_text(&self) -> String {
        format!(
            "airtime_ms={}\n\
             payload_bytes={}\n\
             encoded_bytes={}\n\
             output_bytes={}\n\
             compression_ratio={:.4}\n\
             packets_sent={}\n\
             packets_parsed={}\n\
             bits_transmitted={}\n\
             bit_errors={}\n\
             bit_error_rate={:.6}\n\
             checksum_failures={}\n\
             parity_failures={}\n\
             fec_corrections={}\n",
            self.airtime.as_millis(),
            self.payload_bytes,
            self.encoded_bytes,
            self.output_bytes,
            self.compression_ratio(),
            self.packets_sent,
            self.packets_parsed,
            self.bits_transmitted,
            self.bit_errors,
            self.bit_error_rate(),
            self.checksum_failures,
            self.parity_failures,
            self.fec_corrections,
        )
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}
