//! Ambient calibration and bit sampling.
//!
//! The receiver first watches the scene with the transmitter dark and averages
//! the observed brightness. The decision threshold sits a fixed margin above
//! that ambient mean; every later slot is a `1` iff its brightness strictly
//! exceeds the threshold.
//!
//! Calibration is a caller-owned value, never global state: obtain a
//! [`Threshold`] once and pass it to every bit decision that follows.

use crate::bitio::BitStream;
use tracing::{debug, warn};

/// Threshold used when calibration collected no samples.
pub const DEFAULT_THRESHOLD: f64 = 128.0;

/// Margin added above the ambient mean.
pub const DEFAULT_MARGIN: f64 = 50.0;

/// Rec. 601 luma of an RGB sample.
pub fn calculate_luma(r: f64, g: f64, b: f64) -> f64 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Mean of `samples` plus `margin`, or [`DEFAULT_THRESHOLD`] with no samples.
pub fn calculate_threshold(samples: &[f64], margin: f64) -> f64 {
    if samples.is_empty() {
        return DEFAULT_THRESHOLD;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    mean + margin
}

/// 1 iff `brightness` strictly exceeds `threshold`.
pub fn bit_from_brightness(brightness: f64, threshold: f64) -> bool {
    brightness > threshold
}

/// Turn one brightness sample per slot into bits.
pub fn sample_bits(brightness: &[f64], threshold: &Threshold) -> BitStream {
    brightness
        .iter()
        .map(|&b| bit_from_brightness(b, threshold.value))
        .collect()
}

/// Where a threshold came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSource {
    /// Derived from ambient samples
    Measured,
    /// No samples were collected; the fixed default is in use
    Default,
}

/// A calibrated bit-decision threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub value: f64,
    pub source: ThresholdSource,
}

impl Threshold {
    /// Calibrate from ambient samples.
    pub fn from_samples(samples: &[f64], margin: f64) -> Self {
        let source = if samples.is_empty() {
            ThresholdSource::Default
        } else {
            ThresholdSource::Measured
        };
        Self {
            value: calculate_threshold(samples, margin),
            source,
        }
    }

    /// True if calibration fell back to the default.
    pub fn is_default(&self) -> bool {
        self.source == ThresholdSource::Default
    }

    /// Decide one slot.
    pub fn bit(&self, brightness: f64) -> bool {
        bit_from_brightness(brightness, self.value)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            value: DEFAULT_THRESHOLD,
            source: ThresholdSource::Default,
        }
    }
}

/// Calibration progress.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationState {
    Idle,
    Calibrating { samples: Vec<f64> },
    Calibrated(Threshold),
}

/// Drives the `Idle -> Calibrating -> Calibrated` state machine.
///
/// `Calibrated` is terminal until [`Calibrator::recalibrate`] is called.
#[derive(Debug, Clone)]
pub struct Calibrator {
    state: CalibrationState,
}

impl Calibrator {
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Idle,
        }
    }

    /// Start collecting ambient samples, discarding any previous run.
    pub fn begin(&mut self) {
        self.state = CalibrationState::Calibrating {
            samples: Vec::new(),
        };
    }

    /// Record one ambient brightness sample.
    ///
    /// Ignored unless calibrating.
    pub fn add_sample(&mut self, brightness: f64) {
        if let CalibrationState::Calibrating { samples } = &mut self.state {
            samples.push(brightness);
        }
    }

    /// Record one ambient RGB sample as luma.
    pub fn add_rgb_sample(&mut self, r: f64, g: f64, b: f64) {
        self.add_sample(calculate_luma(r, g, b));
    }

    /// Close the calibration window and fix the threshold.
    ///
    /// Finishing without having begun, or with no samples, yields the default
    /// threshold. Finishing an already calibrated run returns the existing
    /// threshold unchanged.
    pub fn finish(&mut self, margin: f64) -> Threshold {
        let threshold = match &self.state {
            CalibrationState::Calibrated(threshold) => return *threshold,
            CalibrationState::Calibrating { samples } => Threshold::from_samples(samples, margin),
            CalibrationState::Idle => Threshold::default(),
        };

        if threshold.is_default() {
            warn!(
                threshold = threshold.value,
                "No ambient samples collected, using default threshold"
            );
        } else {
            debug!(threshold = threshold.value, "Calibration complete");
        }

        self.state = CalibrationState::Calibrated(threshold);
        threshold
    }

    /// Leave the calibrated state and start a fresh run.
    pub fn recalibrate(&mut self) {
        self.begin();
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// The threshold, once calibrated.
    pub fn threshold(&self) -> Option<Threshold> {
        match self.state {
            CalibrationState::Calibrated(threshold) => Some(threshold),
            _ => None,
        }
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}
