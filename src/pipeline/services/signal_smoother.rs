use tracing::debug;

use super::lighting_classifier::LightingClassifier;
use super::rolling_window::{percentile, RollingWindow};
use crate::config::{LightingConfig, SmoothingConfig};
use crate::pipeline::types::{FrameSample, Lighting};

/// Output of one smoothing step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedSignal {
    /// Raw score as pushed into the history, after any lighting damping.
    pub raw_score: f32,
    /// Robust aggregate of the history window, in [0, 1].
    pub value: f32,
    pub brightness: f32,
    pub variance: f32,
    pub lighting: Lighting,
    /// 1 minus the spread of the history window, in [0, 1].
    pub stability: f32,
    pub history_len: usize,
}

/// Owns the rolling windows and turns per-frame samples into a robust signal.
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    history: RollingWindow,
    brightness: RollingWindow,
    variance: RollingWindow,
    classifier: LightingClassifier,
    trim_fraction: f32,
    iqr_multiplier: f32,
    degraded_prior_weight: f32,
}

impl SignalSmoother {
    pub fn new() -> Self {
        Self::from_config(&SmoothingConfig::default(), &LightingConfig::default())
    }

    pub fn from_config(smoothing: &SmoothingConfig, lighting: &LightingConfig) -> Self {
        Self {
            history: RollingWindow::new(smoothing.history_capacity),
            brightness: RollingWindow::new(smoothing.lighting_capacity),
            variance: RollingWindow::new(smoothing.lighting_capacity),
            classifier: LightingClassifier::from_config(lighting),
            trim_fraction: smoothing.trim_fraction,
            iqr_multiplier: smoothing.iqr_multiplier,
            degraded_prior_weight: smoothing.degraded_prior_weight.clamp(0.0, 1.0),
        }
    }

    pub fn update(&mut self, sample: &FrameSample) -> SmoothedSignal {
        self.brightness.push(sample.luminance);
        self.variance.push(sample.luminance_variance);

        let brightness = self
            .brightness
            .trimmed_mean(self.trim_fraction)
            .unwrap_or(sample.luminance);
        let variance = self
            .variance
            .trimmed_mean(self.trim_fraction)
            .unwrap_or(sample.luminance_variance);
        let lighting = self.classifier.classify(brightness, variance);

        let mut raw_score = sample.raw_score();
        if lighting.is_degraded() {
            // Damping runs before, and independently of, the IQR filter below.
            if let Some(prior) = self.history.median() {
                let damped = self.degraded_prior_weight * prior
                    + (1.0 - self.degraded_prior_weight) * raw_score;
                debug!(
                    "Damping raw score {:.3} -> {:.3} under {}",
                    raw_score,
                    damped,
                    lighting.label()
                );
                raw_score = damped;
            }
        }
        self.history.push(raw_score);

        SmoothedSignal {
            raw_score,
            value: self.robust_value().clamp(0.0, 1.0),
            brightness,
            variance,
            lighting,
            stability: self.stability(),
            history_len: self.history.len(),
        }
    }

    /// Median of the history after discarding entries outside median ± k·IQR.
    fn robust_value(&self) -> f32 {
        let sorted = self.history.sorted();
        let (Some(median), Some(q1), Some(q3)) = (
            percentile(&sorted, 0.5),
            percentile(&sorted, 0.25),
            percentile(&sorted, 0.75),
        ) else {
            return 0.0;
        };
        let band = self.iqr_multiplier * (q3 - q1);
        let kept: Vec<f32> = sorted
            .iter()
            .copied()
            .filter(|v| (v - median).abs() <= band)
            .collect();
        percentile(&kept, 0.5).unwrap_or(median)
    }

    fn stability(&self) -> f32 {
        match (self.history.min(), self.history.max()) {
            (Some(min), Some(max)) => (1.0 - (max - min)).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn brightness_len(&self) -> usize {
        self.brightness.len()
    }

    pub fn variance_len(&self) -> usize {
        self.variance.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.brightness.clear();
        self.variance.clear();
    }
}

impl Default for SignalSmoother {
    fn default() -> Self {
        Self::new()
    }
}
