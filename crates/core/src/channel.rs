//! Simulated optical channel between an LED and a camera.
//!
//! Each bit slot becomes one brightness sample on a 0-255 scale:
//!
//! ```text
//! sample = clamp(ambient + level(bit) + noise, 0, 255)
//! ```
//!
//! where `level` is `on_level` for a 1 and `off_level` for a 0, and `noise` is
//! uniform in `[-noise, +noise]`. Before shaping, each bit may be inverted with
//! probability `flip_rate` to model occlusion and glare.
//!
//! # Determinism
//!
//! All randomness comes from a seeded ChaCha8 RNG. Given the same seed
//! and inputs, outputs are bit-identical.

use crate::bitio::BitStream;
use crate::calibration::{sample_bits, Threshold};
use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Brightest value a sample can take.
pub const MAX_BRIGHTNESS: f64 = 255.0;

/// Configuration for the optical channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    /// Brightness added by the LED when on
    pub on_level: f64,

    /// Brightness added by the LED when off (leakage)
    pub off_level: f64,

    /// Background light level
    pub ambient: f64,

    /// Uniform noise amplitude (±noise)
    pub noise: f64,

    /// Probability [0.0, 1.0] that a bit is inverted
    pub flip_rate: f64,

    /// Random seed for determinism
    pub seed: u64,
}

impl ChannelConfig {
    /// A clean channel: no noise, no flips.
    pub fn perfect(seed: u64) -> Self {
        Self {
            on_level: 120.0,
            off_level: 0.0,
            ambient: 60.0,
            noise: 0.0,
            flip_rate: 0.0,
            seed,
        }
    }

    /// Moderate noise with no flips; decodes cleanly at the default margin.
    pub fn default_with_seed(seed: u64) -> Self {
        Self {
            noise: 10.0,
            ..Self::perfect(seed)
        }
    }

    /// # Errors
    /// `Error::Config` for out-of-range levels or probabilities.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.flip_rate) {
            return Err(Error::Config(format!(
                "flip_rate must be within [0, 1], got {}",
                self.flip_rate
            )));
        }
        if self.noise < 0.0 || self.ambient < 0.0 || self.off_level < 0.0 {
            return Err(Error::Config(
                "noise, ambient and off_level must be non-negative".to_string(),
            ));
        }
        if self.on_level <= self.off_level {
            return Err(Error::Config(format!(
                "on_level ({}) must exceed off_level ({})",
                self.on_level, self.off_level
            )));
        }
        Ok(())
    }
}

/// Counters for channel behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub bits_sent: u64,
    pub bits_flipped: u64,
    pub ambient_samples: u64,
}

/// Seeded LED-to-camera simulator.
///
/// # Thread Safety
/// Not thread-safe; use one instance per thread or synchronize externally.
#[derive(Debug, Clone)]
pub struct OpticalChannel {
    config: ChannelConfig,
    rng: ChaCha8Rng,
    stats: ChannelStats,
}

impl OpticalChannel {
    pub fn new(config: ChannelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            stats: ChannelStats::default(),
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Brightness samples seen with the transmitter dark.
    pub fn ambient_samples(&mut self, count: usize) -> Vec<f64> {
        self.stats.ambient_samples += count as u64;
        let ambient = self.config.ambient;
        (0..count).map(|_| self.shape(ambient)).collect()
    }

    /// One brightness sample per transmitted bit.
    pub fn transmit(&mut self, bits: &[bool]) -> Vec<f64> {
        let mut samples = Vec::with_capacity(bits.len());
        let mut flipped = 0u64;

        for &bit in bits {
            let bit = if self.config.flip_rate > 0.0 && self.rng.gen::<f64>() < self.config.flip_rate {
                flipped += 1;
                !bit
            } else {
                bit
            };

            let level = if bit {
                self.config.on_level
            } else {
                self.config.off_level
            };
            let brightness = self.config.ambient + level;
            samples.push(self.shape(brightness));
        }

        self.stats.bits_sent += bits.len() as u64;
        self.stats.bits_flipped += flipped;
        if flipped > 0 {
            debug!(bits = bits.len(), flipped, "Channel inverted bits");
        }

        samples
    }

    /// Transmit and sample in one step.
    pub fn propagate(&mut self, bits: &[bool], threshold: &Threshold) -> BitStream {
        let samples = self.transmit(bits);
        sample_bits(&samples, threshold)
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    fn shape(&mut self, level: f64) -> f64 {
        let noise = if self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..=self.config.noise)
        } else {
            0.0
        };
        (level + noise).clamp(0.0, MAX_BRIGHTNESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::DEFAULT_MARGIN;

    fn bits(s: &str) -> BitStream {
        s.parse().unwrap()
    }

    #[test]
    fn test_perfect_channel() {
        let mut channel = OpticalChannel::new(ChannelConfig::perfect(1)).unwrap();
        let samples = channel.transmit(&bits("1010"));
        assert_eq!(samples, vec![180.0, 60.0, 180.0, 60.0]);

        let ambient = channel.ambient_samples(3);
        assert_eq!(ambient, vec![60.0; 3]);
        assert_eq!(channel.stats().ambient_samples, 3);
    }

    #[test]
    fn test_noisy_channel_decodes_after_calibration() {
        let mut channel = OpticalChannel::new(ChannelConfig::default_with_seed(42)).unwrap();
        let threshold = Threshold::from_samples(&channel.ambient_samples(32), DEFAULT_MARGIN);

        let sent = bits("1100101011110000101001011100");
        let received = channel.propagate(&sent, &threshold);
        assert_eq!(received, sent);
    }

    #[test]
    fn test_determinism() {
        let config = ChannelConfig::default_with_seed(7);
        let sent = bits("0110100110010110");

        let mut a = OpticalChannel::new(config).unwrap();
        let mut b = OpticalChannel::new(config).unwrap();
        assert_eq!(a.transmit(&sent), b.transmit(&sent));
    }

    #[test]
    fn test_full_flip_inverts() {
        let config = ChannelConfig {
            flip_rate: 1.0,
            ..ChannelConfig::perfect(3)
        };
        let mut channel = OpticalChannel::new(config).unwrap();
        let threshold = Threshold::from_samples(&[60.0], DEFAULT_MARGIN);

        let received = channel.propagate(&bits("1100"), &threshold);
        assert_eq!(received, bits("0011"));
        assert_eq!(channel.stats().bits_flipped, 4);
        assert_eq!(channel.stats().bits_sent, 4);
    }

    #[test]
    fn test_samples_clamped() {
        let config = ChannelConfig {
            ambient: 200.0,
            ..ChannelConfig::perfect(0)
        };
        let mut channel = OpticalChannel::new(config).unwrap();
        assert_eq!(channel.transmit(&bits("1")), vec![MAX_BRIGHTNESS]);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ChannelConfig::perfect(0);
        config.flip_rate = 1.5;
        assert!(OpticalChannel::new(config).is_err());

        let mut config = ChannelConfig::perfect(0);
        config.on_level = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
