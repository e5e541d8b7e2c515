use chrono::Utc;
use image::{DynamicImage, RgbImage};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RawFrame {
    pub image: RgbImage,
    pub timestamp: i64,
    pub id: Uuid,
}

impl RawFrame {
    /// Wraps a tightly packed RGB8 buffer.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AppError> {
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            AppError::FrameSource(format!(
                "pixel buffer does not match {}x{} RGB dimensions",
                width, height
            ))
        })?;
        Ok(Self::from_rgb(image))
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            image,
            timestamp: Utc::now().timestamp_millis(),
            id: Uuid::new_v4(),
        }
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_rgb(image.to_rgb8())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let result = RawFrame::new(4, 4, vec![0; 10]);
        assert!(matches!(result, Err(AppError::FrameSource(_))));
    }

    #[test]
    fn wraps_matching_buffer() {
        let frame = RawFrame::new(2, 2, vec![10; 12]).unwrap();
        assert_eq!(frame.dimensions(), (2, 2));
        assert!(frame.timestamp > 0);
    }
}
