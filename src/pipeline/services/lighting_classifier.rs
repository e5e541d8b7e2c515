use crate::config::LightingConfig;
use crate::pipeline::types::Lighting;

/// Buckets robust brightness/variance estimates into a lighting category.
#[derive(Debug, Clone)]
pub struct LightingClassifier {
    too_dark: f32,
    too_bright: f32,
    low_texture: f32,
}

impl LightingClassifier {
    pub fn new() -> Self {
        Self::from_config(&LightingConfig::default())
    }

    pub fn from_config(config: &LightingConfig) -> Self {
        Self {
            too_dark: config.too_dark,
            too_bright: config.too_bright,
            low_texture: config.low_texture,
        }
    }

    /// Brightness is checked before texture: a dark frame is reported as dark even when flat.
    pub fn classify(&self, brightness: f32, variance: f32) -> Lighting {
        if brightness < self.too_dark {
            Lighting::TooDark
        } else if brightness > self.too_bright {
            Lighting::TooBright
        } else if variance < self.low_texture {
            Lighting::LowTexture
        } else {
            Lighting::Ok
        }
    }
}

impl Default for LightingClassifier {
    fn default() -> Self {
        Self::new()
    }
}
