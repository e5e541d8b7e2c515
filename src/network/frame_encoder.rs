use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::config::RemoteConfig;
use crate::error::{AppError, RemoteError};
use crate::pipeline::types::RawFrame;

/// Turns a frame into the compact base64 JPEG payload sent to the enrichment endpoint.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    max_dimension: u32,
    quality: u8,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::from_config(&RemoteConfig::default())
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            max_dimension: config.max_dimension.max(1),
            quality: config.jpeg_quality.clamp(1, 100),
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    pub fn encode(&self, frame: &RawFrame) -> Result<String, AppError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(RemoteError::Encode("frame has no pixels".to_string()).into());
        }

        let image = DynamicImage::ImageRgb8(frame.image.clone());
        // resize keeps the aspect ratio and fits inside the bounding box
        let scaled = if width.max(height) > self.max_dimension {
            image.resize(self.max_dimension, self.max_dimension, FilterType::Triangle)
        } else {
            image
        };

        let mut bytes = Vec::new();
        scaled
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, self.quality))?;
        Ok(BASE64.encode(bytes))
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn large_frames_are_downscaled() {
        let frame = RawFrame::from_rgb(RgbImage::from_pixel(1280, 720, Rgb([30, 160, 40])));
        let payload = FrameEncoder::new().with_max_dimension(256).encode(&frame).unwrap();
        let bytes = BASE64.decode(payload).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 256);
        assert_eq!(decoded.height(), 144);
    }

    #[test]
    fn small_frames_keep_their_size() {
        let frame = RawFrame::from_rgb(RgbImage::from_pixel(64, 48, Rgb([200, 20, 20])));
        let bytes = BASE64.decode(FrameEncoder::new().encode(&frame).unwrap()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn empty_frame_is_an_encode_error() {
        let frame = RawFrame::from_rgb(RgbImage::new(0, 0));
        assert!(matches!(
            FrameEncoder::new().encode(&frame),
            Err(AppError::Remote(RemoteError::Encode(_)))
        ));
    }
}
