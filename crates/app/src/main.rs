//! vlc-sim: send a message over a simulated LED-to-camera link.
//!
//! Calibrates against ambient light, encodes the message, pushes every packet
//! through the seeded optical channel, decodes what the camera saw, and prints
//! link metrics.

mod config;
mod input_gen;

use anyhow::{anyhow, bail, Context, Result};
use config::Config;
use input_gen::generate_sample_message;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vlc_link_core::calibration::{Calibrator, DEFAULT_MARGIN};
use vlc_link_core::channel::OpticalChannel;
use vlc_link_core::envelope::PayloadMode;
use vlc_link_core::link::{encode_payload, Receiver};
use vlc_link_core::metrics::LinkMetrics;
use vlc_link_core::packet::{PacketFlags, PacketType};

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_args(&args).map_err(|e| anyhow!(e))?;
    if config.print_config {
        config.print();
    }

    let message = config
        .message
        .clone()
        .unwrap_or_else(|| generate_sample_message(config.channel.seed, config.sample_bytes));

    let mut metrics = LinkMetrics::new();
    let mut channel = OpticalChannel::new(config.channel).context("invalid channel configuration")?;

    let mut calibrator = Calibrator::new();
    calibrator.begin();
    for sample in channel.ambient_samples(config.calibration_samples) {
        calibrator.add_sample(sample);
    }
    let threshold = calibrator.finish(DEFAULT_MARGIN);
    info!(threshold = threshold.value, "Calibrated receiver");

    let tx = encode_payload(
        config.mode,
        &message,
        packet_type_for(config.mode),
        PacketFlags::empty(),
        &config.link,
    )
    .context("failed to encode message")?;
    metrics.record_transmission(&tx);
    info!(
        bytes = tx.payload_len(),
        packets = tx.packet_count(),
        bits = tx.bit_len(),
        compressed = tx.flags().contains(PacketFlags::COMPRESSED),
        "Transmitting"
    );

    let mut receiver = Receiver::new(config.link.clone())?;
    let mut received = None;

    for packet in tx.packets() {
        let bits = channel.propagate(packet, &threshold);
        metrics.record_bits(packet, &bits);

        match receiver.push_bits(&bits) {
            Ok(Some(rx)) => received = Some(rx),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Packet rejected");
                metrics.record_error(&e);
            }
        }
    }

    metrics.complete();

    if let Some(rx) = &received {
        metrics.record_received(rx);
    }

    if config.print_metrics {
        metrics.print_summary();
    }
    metrics.print_result();

    match received {
        Some(rx) if rx.mode == config.mode && rx.payload == message => Ok(()),
        Some(_) => bail!("received payload does not match the message sent"),
        None => bail!("payload incomplete, missing chunks {:?}", receiver.missing()),
    }
}

fn packet_type_for(mode: PayloadMode) -> PacketType {
    match mode {
        PayloadMode::Legacy => PacketType::TEXT,
        PayloadMode::Auth => PacketType::AUTH,
        PayloadMode::Config => PacketType::CONFIG,
        PayloadMode::Command => PacketType::COMMAND,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
