use futures::future::{self, BoxFuture};
use image::{Rgb, RgbImage};
use std::task::{Context, Poll};
use tower::Service;

use crate::config::SamplingConfig;
use crate::error::AppError;
use crate::pipeline::types::{FrameSample, RawFrame};

/// Reduces a frame to channel averages plus an independent, coarser luminance sample.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    color_stride: usize,
    luma_stride: usize,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::from_config(&SamplingConfig::default())
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self {
            color_stride: config.color_stride.max(1),
            luma_stride: config.luma_stride.max(1),
        }
    }

    pub fn with_color_stride(mut self, stride: usize) -> Self {
        self.color_stride = stride.max(1);
        self
    }

    pub fn with_luma_stride(mut self, stride: usize) -> Self {
        self.luma_stride = stride.max(1);
        self
    }

    fn rgb_to_luma(px: &Rgb<u8>) -> f32 {
        // Rec. 709 luminance
        (0.2126 * px[0] as f32 + 0.7152 * px[1] as f32 + 0.0722 * px[2] as f32) / 255.0
    }

    /// Returns `None` for an empty grid.
    pub fn sample(&self, image: &RgbImage) -> Option<FrameSample> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let (mut r, mut g, mut b) = (0f64, 0f64, 0f64);
        let mut color_count = 0u64;
        for px in image.pixels().step_by(self.color_stride) {
            r += px[0] as f64;
            g += px[1] as f64;
            b += px[2] as f64;
            color_count += 1;
        }

        let mut sum = 0f64;
        let mut sum_sq = 0f64;
        let mut luma_count = 0u64;
        for px in image.pixels().step_by(self.luma_stride) {
            let l = Self::rgb_to_luma(px) as f64;
            sum += l;
            sum_sq += l * l;
            luma_count += 1;
        }

        let scale = 255.0 * color_count as f64;
        let mean = sum / luma_count as f64;
        let variance = (sum_sq / luma_count as f64 - mean * mean).max(0.0);

        Some(FrameSample::new(
            (r / scale) as f32,
            (g / scale) as f32,
            (b / scale) as f32,
            mean as f32,
            variance as f32,
        ))
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<RawFrame> for FrameSampler {
    type Response = Option<FrameSample>;
    type Error = AppError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), AppError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: RawFrame) -> Self::Future {
        let sample = self.sample(&frame.image);
        Box::pin(future::ready(Ok(sample)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[test]
    fn empty_grid_yields_nothing() {
        let sampler = FrameSampler::new();
        assert!(sampler.sample(&RgbImage::new(0, 10)).is_none());
        assert!(sampler.sample(&RgbImage::new(10, 0)).is_none());
    }

    #[test]
    fn uniform_frame_has_exact_averages_and_no_variance() {
        let image = RgbImage::from_pixel(32, 32, Rgb([51, 153, 102]));
        let sample = FrameSampler::new().sample(&image).unwrap();
        assert!((sample.r - 0.2).abs() < 1e-4);
        assert!((sample.g - 0.6).abs() < 1e-4);
        assert!((sample.b - 0.4).abs() < 1e-4);
        assert!(sample.luminance_variance.abs() < 1e-6);
    }

    #[test]
    fn striped_frame_has_texture() {
        let image = RgbImage::from_fn(16, 16, |x, _| {
            if x % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let sample = FrameSampler::new().with_luma_stride(1).sample(&image).unwrap();
        assert!((sample.luminance - 0.5).abs() < 1e-3);
        assert!((sample.luminance_variance - 0.25).abs() < 1e-3);
    }

    #[tokio::test]
    async fn service_samples_raw_frames() {
        let frame = RawFrame::from_rgb(RgbImage::from_pixel(8, 8, Rgb([0, 255, 0])));
        let sample = FrameSampler::new().oneshot(frame).await.unwrap().unwrap();
        assert!(sample.green_dominance() > 0.99);
    }
}
