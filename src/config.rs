use serde::Deserialize;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_CONFIG_FILE: &str = "healthscan";
const ENV_PREFIX: &str = "HEALTHSCAN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub sampling: SamplingConfig,
    pub smoothing: SmoothingConfig,
    pub lighting: LightingConfig,
    pub confidence: ConfidenceConfig,
    pub gate: GateConfig,
    pub remote: RemoteConfig,
    pub endpoint: EndpointConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// Pixel strides used when reducing a frame to a `FrameSample`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub color_stride: usize,
    pub luma_stride: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub history_capacity: usize,
    pub lighting_capacity: usize,
    /// Fraction dropped from each tail before averaging brightness/variance.
    pub trim_fraction: f32,
    pub iqr_multiplier: f32,
    /// Weight of the prior median when a raw score is damped under degraded lighting.
    pub degraded_prior_weight: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub too_dark: f32,
    pub too_bright: f32,
    pub low_texture: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub dominance_weight: f32,
    pub chroma_weight: f32,
    pub stability_weight: f32,
    pub dominance_gain: f32,
    pub chroma_gain: f32,
    pub full_window_samples: usize,
    pub full_window_bonus: f32,
    pub degraded_penalty: f32,
    pub flat_penalty: f32,
    pub flat_variance: f32,
    pub floor: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub confirmations: u32,
    pub min_change: u8,
    pub voice_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub endpoint_url: String,
    pub use_model: bool,
    pub base_interval_ms: u64,
    pub backoff_floor_ms: u64,
    pub backoff_ceiling_ms: u64,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

/// Server side of the enrichment contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub max_payload_bytes: usize,
    pub api_key: Option<String>,
    pub upstream_url: String,
    /// Name sent upstream and stamped on every model-backed verdict.
    pub model_name: String,
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_ms: u64,
    pub demo_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            color_stride: 4,
            luma_stride: 16,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            history_capacity: 25,
            lighting_capacity: 30,
            trim_fraction: 0.15,
            iqr_multiplier: 1.5,
            degraded_prior_weight: 0.7,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            too_dark: 0.12,
            too_bright: 0.85,
            low_texture: 0.002,
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            dominance_weight: 0.45,
            chroma_weight: 0.25,
            stability_weight: 0.30,
            dominance_gain: 2.2,
            chroma_gain: 1.8,
            full_window_samples: 10,
            full_window_bonus: 0.1,
            degraded_penalty: 0.7,
            flat_penalty: 0.75,
            flat_variance: 0.002,
            floor: 0.2,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            confirmations: 2,
            min_change: 1,
            voice_enabled: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint_url: "http://127.0.0.1:8787/api/score".to_string(),
            use_model: true,
            base_interval_ms: 2500,
            backoff_floor_ms: 2000,
            backoff_ceiling_ms: 60_000,
            max_dimension: 512,
            jpeg_quality: 70,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 400_000,
            api_key: None,
            upstream_url: "http://127.0.0.1:9000/v1/describe".to_string(),
            model_name: "healthscan-vision".to_string(),
            max_concurrent_requests: 8,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 400,
            demo_image: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn backoff_floor(&self) -> Duration {
        Duration::from_millis(self.backoff_floor_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }
}

impl SchedulerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Configuration {
    /// Loads `healthscan.toml` (or `path`) and overlays `HEALTHSCAN__SECTION__KEY` variables.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let configuration: Configuration = ::config::Config::builder()
            .add_source(
                ::config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE))
                    .required(path.is_some()),
            )
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.sampling.color_stride == 0 || self.sampling.luma_stride == 0 {
            return Err(invalid("Sampling strides must be greater than 0"));
        }
        if self.smoothing.history_capacity == 0 || self.smoothing.lighting_capacity == 0 {
            return Err(invalid("Window capacities must be greater than 0"));
        }
        if !(0.0..0.5).contains(&self.smoothing.trim_fraction) {
            return Err(invalid("Trim fraction must be in [0, 0.5)"));
        }
        if self.gate.confirmations == 0 {
            return Err(invalid("Gate confirmations must be greater than 0"));
        }
        if self.remote.backoff_floor_ms > self.remote.backoff_ceiling_ms {
            return Err(invalid("Backoff floor must not exceed the ceiling"));
        }
        if self.scheduler.tick_ms == 0 {
            return Err(invalid("Scheduler tick must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(::config::ConfigError::Message(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let configuration = Configuration::default();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.smoothing.history_capacity, 25);
        assert_eq!(configuration.smoothing.lighting_capacity, 30);
        assert_eq!(configuration.remote.base_interval(), Duration::from_millis(2500));
        assert_eq!(configuration.endpoint.max_payload_bytes, 400_000);
    }

    #[test]
    fn rejects_zero_stride() {
        let mut configuration = Configuration::default();
        configuration.sampling.color_stride = 0;
        assert!(matches!(configuration.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_inverted_backoff() {
        let mut configuration = Configuration::default();
        configuration.remote.backoff_floor_ms = 120_000;
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let configuration = Configuration::load(None).expect("defaults should load");
        assert_eq!(configuration.scheduler.tick_ms, 400);
    }
}
