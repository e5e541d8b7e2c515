use crate::config::ConfidenceConfig;
use crate::pipeline::types::Lighting;

const NEUTRAL_DOMINANCE: f32 = 1.0 / 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub green_dominance: f32,
    pub chroma_spread: f32,
    pub stability: f32,
    pub history_len: usize,
    pub lighting: Lighting,
    /// Trimmed-mean luminance variance.
    pub variance: f32,
}

/// Blends dominance, chroma and stability into a bounded certainty.
#[derive(Debug, Clone)]
pub struct ConfidenceEstimator {
    config: ConfidenceConfig,
}

impl ConfidenceEstimator {
    pub fn new() -> Self {
        Self::from_config(&ConfidenceConfig::default())
    }

    pub fn from_config(config: &ConfidenceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn floor(&self) -> f32 {
        self.config.floor
    }

    /// Returns a value in [floor, 1].
    pub fn estimate(&self, inputs: &ConfidenceInputs) -> f32 {
        let cfg = &self.config;
        let dominance =
            ((inputs.green_dominance - NEUTRAL_DOMINANCE).abs() * cfg.dominance_gain).min(1.0);
        let chroma = (inputs.chroma_spread * cfg.chroma_gain).min(1.0);
        let stability = inputs.stability.clamp(0.0, 1.0);

        let mut confidence = cfg.dominance_weight * dominance
            + cfg.chroma_weight * chroma
            + cfg.stability_weight * stability;

        if inputs.history_len >= cfg.full_window_samples {
            confidence = (confidence + cfg.full_window_bonus).min(1.0);
        }
        if inputs.lighting.is_degraded() {
            confidence *= cfg.degraded_penalty;
        }
        if inputs.variance < cfg.flat_variance {
            confidence *= cfg.flat_penalty;
        }

        if confidence.is_nan() {
            return cfg.floor;
        }
        confidence.clamp(cfg.floor, 1.0)
    }

    pub fn to_percent(confidence: f32) -> u8 {
        (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self::new()
    }
}
