//! Configuration for the vlc-sim application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized channel conditions that are reproducible with a
//! seed).
//!
//! The tool works with ZERO arguments. All defaults are printable with
//! `--print-config` so runs are reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use vlc_link_core::channel::ChannelConfig;
use vlc_link_core::envelope::PayloadMode;
use vlc_link_core::fec::FecConfig;
use vlc_link_core::link::{LinkConfig, DEFAULT_BIT_DURATION};

/// Complete configuration for a simulated transfer.
#[derive(Debug, Clone)]
pub struct Config {
    // === Payload ===
    /// Message to send (None = generate sample)
    pub message: Option<String>,

    /// Size of the generated sample
    pub sample_bytes: usize,

    /// Mode tag for the payload
    pub mode: PayloadMode,

    // === Link ===
    pub link: LinkConfig,

    // === Channel ===
    pub channel: ChannelConfig,

    /// Ambient samples taken before transmitting
    pub calibration_samples: usize,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// Without `--seed`, a time-based seed is used; with it, the run is fully
    /// deterministic.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut message: Option<String> = None;
        let mut seed: Option<u64> = None;
        let mut sample_bytes: Option<usize> = None;
        let mut mode = PayloadMode::Legacy;
        let mut chunk_bytes: Option<usize> = None;
        let mut compression = true;
        let mut fec = false;
        let mut parity = false;
        let mut bit_ms: Option<u64> = None;
        let mut flip_rate: Option<f64> = None;
        let mut noise: Option<f64> = None;
        let mut ambient: Option<f64> = None;
        let mut print_config = false;
        let mut print_metrics = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--message" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--message requires text".to_string());
                    }
                    message = Some(args[i].clone());
                }
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--size" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--size requires a number".to_string());
                    }
                    sample_bytes = Some(args[i].parse().map_err(|_| "invalid size")?);
                }
                "--mode" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--mode requires a name".to_string());
                    }
                    mode = parse_mode(&args[i])?;
                }
                "--chunk-bytes" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--chunk-bytes requires a number".to_string());
                    }
                    chunk_bytes = Some(args[i].parse().map_err(|_| "invalid chunk-bytes")?);
                }
                "--bit-ms" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--bit-ms requires a number".to_string());
                    }
                    bit_ms = Some(args[i].parse().map_err(|_| "invalid bit-ms")?);
                }
                "--no-compression" => {
                    compression = false;
                }
                "--fec" => {
                    fec = true;
                }
                "--parity" => {
                    parity = true;
                }
                "--flip-rate" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--flip-rate requires a number".to_string());
                    }
                    flip_rate = Some(args[i].parse().map_err(|_| "invalid flip-rate")?);
                }
                "--noise" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--noise requires a number".to_string());
                    }
                    noise = Some(args[i].parse().map_err(|_| "invalid noise")?);
                }
                "--ambient" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--ambient requires a number".to_string());
                    }
                    ambient = Some(args[i].parse().map_err(|_| "invalid ambient")?);
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |t| t.as_millis() as u64)
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let channel = ChannelConfig {
            ambient: ambient.unwrap_or_else(|| rng.gen_range(20.0..=80.0)),
            noise: noise.unwrap_or_else(|| rng.gen_range(0.0..=20.0)),
            flip_rate: flip_rate.unwrap_or(0.0),
            ..ChannelConfig::perfect(seed)
        };

        let link = LinkConfig {
            compression,
            fec: fec.then(FecConfig::default),
            max_chunk_size: chunk_bytes.unwrap_or(vlc_link_core::chunk::DEFAULT_MAX_CHUNK_SIZE),
            parity,
            bit_duration: bit_ms.map_or(DEFAULT_BIT_DURATION, Duration::from_millis),
        };

        let config = Config {
            message,
            sample_bytes: sample_bytes.unwrap_or_else(|| rng.gen_range(64..=1024)),
            mode,
            link,
            channel,
            calibration_samples: 32,
            print_config,
            print_metrics,
        };

        Ok(config)
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.message {
            Some(message) => println!("Message: {:?}", message),
            None => println!("Message: (generate {} bytes)", self.sample_bytes),
        }
        println!("Mode: {}", self.mode);
        println!();
        println!("=== Link ===");
        println!("Compression: {}", on_off(self.link.compression));
        match &self.link.fec {
            Some(fec) => println!("FEC: {} data / {} parity shards", fec.data_shards, fec.parity_shards),
            None => println!("FEC: off"),
        }
        println!("Parity line coding: {}", on_off(self.link.parity));
        println!("Max chunk size: {} bytes", self.link.max_chunk_size);
        println!("Bit duration: {} ms", self.link.bit_duration.as_millis());
        println!();
        println!("=== Optical Channel ===");
        println!("Seed: {}", self.channel.seed);
        println!("Ambient: {:.1}", self.channel.ambient);
        println!("On level: {:.1}", self.channel.on_level);
        println!("Noise: ±{:.1}", self.channel.noise);
        println!("Flip rate: {:.2}%", self.channel.flip_rate * 100.0);
        println!("Calibration samples: {}", self.calibration_samples);
        println!();
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn parse_mode(name: &str) -> Result<PayloadMode, String> {
    match name {
        "legacy" => Ok(PayloadMode::Legacy),
        "auth" => Ok(PayloadMode::Auth),
        "config" => Ok(PayloadMode::Config),
        "command" => Ok(PayloadMode::Command),
        _ => Err(format!("unknown mode: {name} (expected legacy, auth, config or command)")),
    }
}

fn print_help() {
    println!("vlc-sim: Simulated visible-light data transfer");
    println!();
    println!("USAGE:");
    println!("    vlc-sim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --message <TEXT>        Message to send (default: generate sample)");
    println!("    --size <N>              Sample size in bytes (default: random 64-1024)");
    println!("    --mode <NAME>           legacy, auth, config or command (default: legacy)");
    println!("    --seed <N>              Random seed for determinism");
    println!();
    println!("    --chunk-bytes <N>       Max chunk size (default: 256)");
    println!("    --bit-ms <MS>           Bit duration (default: 100)");
    println!("    --no-compression        Never compress");
    println!("    --fec                   Append parity-shard FEC (4 data / 2 parity)");
    println!("    --parity                Send each byte as a 9-bit parity frame");
    println!();
    println!("    --ambient <LEVEL>       Ambient light 0-255 (default: random 20-80)");
    println!("    --noise <LEVEL>         Sample noise amplitude (default: random 0-20)");
    println!("    --flip-rate <RATE>      Bit inversion probability 0.0-1.0 (default: 0)");
    println!();
    println!("    --print-config          Print resolved configuration");
    println!("    --no-metrics            Don't print metrics summary");
    println!("    --help, -h              Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    vlc-sim                                # Run with random defaults");
    println!("    vlc-sim --seed 42                      # Deterministic run");
    println!("    vlc-sim --message HELLO --parity       # Short message with parity frames");
    println!("    vlc-sim --flip-rate 0.001 --fec        # Noisy channel");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_seeded_defaults_reproducible() {
        let a = Config::from_args(&args(&["--seed", "42"])).unwrap();
        let b = Config::from_args(&args(&["--seed", "42"])).unwrap();

        assert_eq!(a.sample_bytes, b.sample_bytes);
        assert_eq!(a.channel, b.channel);
        assert!(a.link.compression);
        assert!(a.link.fec.is_none());
    }

    #[test]
    fn test_explicit_flags() {
        let config = Config::from_args(&args(&[
            "--message", "HELLO", "--mode", "command", "--chunk-bytes", "64", "--fec", "--parity",
            "--no-compression", "--noise", "0", "--ambient", "40", "--flip-rate", "0.01", "--bit-ms", "5",
        ]))
        .unwrap();

        assert_eq!(config.message.as_deref(), Some("HELLO"));
        assert_eq!(config.mode, PayloadMode::Command);
        assert_eq!(config.link.max_chunk_size, 64);
        assert_eq!(config.link.fec, Some(FecConfig::default()));
        assert!(config.link.parity);
        assert!(!config.link.compression);
        assert_eq!(config.link.bit_duration, Duration::from_millis(5));
        assert_eq!(config.channel.noise, 0.0);
        assert_eq!(config.channel.ambient, 40.0);
        assert_eq!(config.channel.flip_rate, 0.01);
    }

    #[test]
    fn test_bad_arguments() {
        assert!(Config::from_args(&args(&["--seed"])).is_err());
        assert!(Config::from_args(&args(&["--seed", "x"])).is_err());
        assert!(Config::from_args(&args(&["--mode", "loud"])).is_err());
        assert!(Config::from_args(&args(&["--bogus"])).is_err());
    }
}
