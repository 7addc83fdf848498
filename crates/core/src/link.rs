//! End-to-end encode/decode pipeline.
//!
//! These are the two entry points upper layers use:
//!
//! ```text
//! encode:  payload -> envelope -> LZ77? -> FEC? -> chunks -> packets -> parity? -> bits
//! decode:  bits -> parity? -> packets -> chunks -> FEC? -> LZ77? -> envelope -> payload
//! ```
//!
//! The transmitter decides per payload whether compression was worth it and
//! whether chunking was needed, and records both in the packet FLAGS. The
//! receiver follows the FLAGS, so a stream is self-describing apart from the
//! parity line coding, which both ends must agree on through [`LinkConfig`].
//!
//! # Example
//! ```
//! use vlc_link_core::envelope::PayloadMode;
//! use vlc_link_core::link::{decode_payload, encode_payload, LinkConfig};
//! use vlc_link_core::packet::{PacketFlags, PacketType};
//!
//! let config = LinkConfig::default();
//! let tx = encode_payload(PayloadMode::Legacy, "HELLO", PacketType::TEXT, PacketFlags::empty(), &config).unwrap();
//!
//! let rx = decode_payload(&tx.to_bit_stream(), &config).unwrap().unwrap();
//! assert_eq!(rx.payload, "HELLO");
//! ```

use crate::bitio::BitStream;
use crate::chunk::{chunk_data, Chunk, CHUNK_HEADER_SIZE, DEFAULT_MAX_CHUNK_SIZE};
use crate::envelope::{Envelope, PayloadMode};
use crate::error::{Error, PacketError, ParityError, Result};
use crate::fec::{fec_decode, fec_encode, FecBlock, FecConfig};
use crate::lz77::{compress_data, decompress_data};
use crate::packet::{Packet, PacketFlags, PacketStream, PacketType, MAX_PAYLOAD_LEN};
use crate::parity::{decode_bits_with_parity, encode_bits_with_parity};
use crate::reassembly::ChunkBuffer;
use std::time::Duration;
use tracing::debug;

/// Default time each bit is held on the light source.
pub const DEFAULT_BIT_DURATION: Duration = Duration::from_millis(100);

/// Largest `max_chunk_size` whose chunk packets still fit one LENGTH field.
pub const MAX_CHUNK_SIZE: usize = MAX_PAYLOAD_LEN - CHUNK_HEADER_SIZE;

/// Flags owned by the pipeline; caller-supplied values are replaced.
const PIPELINE_FLAGS: PacketFlags = PacketFlags::COMPRESSED
    .union(PacketFlags::CHUNKED)
    .union(PacketFlags::FEC_ENABLED);

/// Link-layer settings shared by transmitter and receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    /// Try LZ77 on payloads long enough to benefit
    pub compression: bool,

    /// Append parity-shard FEC bytes
    pub fec: Option<FecConfig>,

    /// Largest payload slice carried by one packet
    pub max_chunk_size: usize,

    /// Send every byte as a 9-bit even-parity frame
    pub parity: bool,

    /// Time per bit on the optical channel
    pub bit_duration: Duration,
}

impl LinkConfig {
    /// # Errors
    /// `Error::Config` for a chunk size outside `1..=MAX_CHUNK_SIZE`, a zero
    /// bit duration, or a bad FEC configuration.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CHUNK_SIZE).contains(&self.max_chunk_size) {
            return Err(Error::Config(format!(
                "max_chunk_size must be within 1..={MAX_CHUNK_SIZE}, got {}",
                self.max_chunk_size
            )));
        }
        if self.bit_duration.is_zero() {
            return Err(Error::Config("bit_duration must be non-zero".to_string()));
        }
        if let Some(fec) = &self.fec {
            fec.validate()?;
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            compression: true,
            fec: None,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            parity: false,
            bit_duration: DEFAULT_BIT_DURATION,
        }
    }
}

/// Bits ready for the physical layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    packets: Vec<BitStream>,
    flags: PacketFlags,
    payload_len: usize,
    encoded_len: usize,
    bit_duration: Duration,
}

impl Transmission {
    /// Each packet's bits, in sending order.
    pub fn packets(&self) -> &[BitStream] {
        &self.packets
    }

    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    /// FLAGS applied to every packet (CHUNKED only if split).
    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    /// Size of the enveloped payload before compression, in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Bytes handed to the chunker, after compression and FEC.
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// Total bits across all packets.
    pub fn bit_len(&self) -> usize {
        self.packets.iter().map(|p| p.len()).sum()
    }

    /// All packets back to back.
    pub fn to_bit_stream(&self) -> BitStream {
        let mut stream = BitStream::with_capacity(self.bit_len());
        for packet in &self.packets {
            stream.extend_from_stream(packet);
        }
        stream
    }

    /// Time on air at the configured bit duration.
    pub fn airtime(&self) -> Duration {
        let bits = u32::try_from(self.bit_len()).unwrap_or(u32::MAX);
        self.bit_duration.saturating_mul(bits)
    }
}

/// Encode an application payload into transmittable bits.
///
/// `COMPRESSED`, `CHUNKED` and `FEC_ENABLED` in `flags` are ignored; the
/// pipeline sets them according to what it actually applied. Other flags are
/// passed through on every packet.
pub fn encode_payload(
    mode: PayloadMode,
    payload: &str,
    packet_type: PacketType,
    flags: PacketFlags,
    config: &LinkConfig,
) -> Result<Transmission> {
    config.validate()?;

    let wire = Envelope::wrap(mode, payload);
    let mut flags = flags.difference(PIPELINE_FLAGS);

    let compressed = compress_data(wire.as_bytes(), config.compression);
    if compressed.is_compressed() {
        flags |= PacketFlags::COMPRESSED;
    }
    let mut body = compressed.into_bytes();

    if let Some(fec) = &config.fec {
        body = fec_encode(&body, fec)?.to_bytes();
        flags |= PacketFlags::FEC_ENABLED;
    }

    let encoded_len = body.len();
    let packets: Vec<Packet> = if body.len() > config.max_chunk_size {
        flags |= PacketFlags::CHUNKED;
        chunk_data(&body, packet_type, config.max_chunk_size)?
            .iter()
            .map(|chunk| chunk.to_packet(flags))
            .collect()
    } else {
        vec![Packet::new(packet_type, flags, body)]
    };

    let mut streams = Vec::with_capacity(packets.len());
    for packet in &packets {
        let bits = packet.to_bits()?;
        streams.push(if config.parity {
            encode_bits_with_parity(&bits)?
        } else {
            bits
        });
    }

    debug!(
        mode = %mode,
        payload_len = wire.len(),
        packets = streams.len(),
        flags = flags.bits(),
        "Encoded payload"
    );

    Ok(Transmission {
        packets: streams,
        flags,
        payload_len: wire.len(),
        encoded_len,
        bit_duration: config.bit_duration,
    })
}

/// A successfully decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub mode: PayloadMode,
    pub payload: String,
    pub packet_type: PacketType,
    pub flags: PacketFlags,
    /// Positions patched by FEC (0 without FEC)
    pub fec_corrections: usize,
    /// Packets the payload arrived in
    pub packets: usize,
}

impl Received {
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.mode, self.payload.clone())
    }
}

/// Decodes packets into payloads, buffering chunks across calls.
///
/// One receiver tracks one logical transmission at a time. Feed it bits as
/// bursts arrive; it returns `Ok(None)` while chunks are outstanding.
#[derive(Debug, Clone)]
pub struct Receiver {
    config: LinkConfig,
    buffer: ChunkBuffer,
    header: Option<(PacketType, PacketFlags)>,
}

impl Receiver {
    pub fn new(config: LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            buffer: ChunkBuffer::new(),
            header: None,
        })
    }

    /// Decode a received burst of bits.
    ///
    /// With parity line coding enabled the burst must start on a frame
    /// boundary.
    ///
    /// # Errors
    /// - `ParityError::Mismatch` for a failed byte frame
    /// - `PacketError::FrameNotFound` if the burst holds no packet at all
    /// - any packet, chunk, FEC, compression or envelope error
    pub fn push_bits(&mut self, bits: &[bool]) -> Result<Option<Received>> {
        let stream = if self.config.parity {
            let (stream, report) = decode_bits_with_parity(bits)?;
            if let Some(&frame_index) = report.failed_frames.first() {
                return Err(ParityError::Mismatch { frame_index }.into());
            }
            stream
        } else {
            BitStream::from(bits)
        };

        let mut found = false;
        for packet in PacketStream::new(&stream) {
            found = true;
            if let Some(received) = self.push_packet(packet?)? {
                return Ok(Some(received));
            }
        }

        if !found {
            return Err(PacketError::FrameNotFound.into());
        }
        Ok(None)
    }

    /// Decode one parsed packet.
    ///
    /// A standalone packet is decoded on its own and leaves any partially
    /// collected chunk set in place.
    pub fn push_packet(&mut self, packet: Packet) -> Result<Option<Received>> {
        if !packet.flags.contains(PacketFlags::CHUNKED) {
            return self
                .finish(packet.packet_type, packet.flags, packet.payload, 1)
                .map(Some);
        }

        let chunk = Chunk::from_packet(&packet)?;
        self.header
            .get_or_insert((packet.packet_type, packet.flags));

        if !self.buffer.insert(chunk)? {
            return Ok(None);
        }

        let Some(body) = self.buffer.reassemble() else {
            return Ok(None);
        };
        let packets = self.buffer.received_count();
        let (packet_type, flags) = self
            .header
            .take()
            .unwrap_or((packet.packet_type, packet.flags));
        self.reset();

        self.finish(packet_type, flags, body, packets).map(Some)
    }

    /// Chunk sequences still outstanding.
    pub fn missing(&self) -> Vec<u16> {
        self.buffer.missing()
    }

    /// Forget any partially received payload.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.header = None;
    }

    fn finish(
        &self,
        packet_type: PacketType,
        flags: PacketFlags,
        mut body: Vec<u8>,
        packets: usize,
    ) -> Result<Received> {
        let mut fec_corrections = 0;

        if flags.contains(PacketFlags::FEC_ENABLED) {
            let fec = self.config.fec.unwrap_or_default();
            let block = FecBlock::from_bytes(&body, fec.parity_shards)?;
            let decoded = fec_decode(&block, &fec)?;
            fec_corrections = decoded.corrections;
            body = decoded.data;
        }

        if flags.contains(PacketFlags::COMPRESSED) {
            body = decompress_data(&body)?;
        }

        let envelope = Envelope::from_bytes(&body)?;

        debug!(
            mode = %envelope.mode,
            payload_len = envelope.body.len(),
            packets,
            fec_corrections,
            "Decoded payload"
        );

        Ok(Received {
            mode: envelope.mode,
            payload: envelope.body,
            packet_type,
            flags,
            fec_corrections,
            packets,
        })
    }
}

/// Decode a complete received bit stream.
///
/// Returns `Ok(None)` if the stream holds only part of a chunked payload.
pub fn decode_payload(bits: &[bool], config: &LinkConfig) -> Result<Option<Received>> {
    Receiver::new(config.clone())?.push_bits(bits)
}
