use std::path::Path;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::info;

use crate::error::AppError;
use crate::pipeline::types::RawFrame;

/// Produces frames on demand for the sampling tick.
///
/// `Ok(None)` means no new frame is available and the tick is skipped.
/// `Err` is an acquisition failure; the tick is skipped and retried next time.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, AppError>;
}

/// Replays a single image file, handy for demos and manual checks.
pub struct StillImageSource {
    frame: RawFrame,
}

impl StillImageSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| AppError::FrameSource(format!("{}: {}", path.display(), e)))?;
        info!(
            "Loaded still image {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self {
            frame: RawFrame::from_dynamic(&image),
        })
    }

    pub fn from_frame(frame: RawFrame) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, AppError> {
        Ok(Some(RawFrame::from_rgb(self.frame.image.clone())))
    }
}

/// Drains frames pushed by a capture task. Only the newest queued frame is used.
pub struct ChannelFrameSource {
    frame_rx: mpsc::Receiver<RawFrame>,
}

impl ChannelFrameSource {
    pub fn new(buffer_size: usize) -> (mpsc::Sender<RawFrame>, Self) {
        let (frame_tx, frame_rx) = mpsc::channel(buffer_size.max(1));
        (frame_tx, Self { frame_rx })
    }
}

impl FrameSource for ChannelFrameSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, AppError> {
        let mut latest = None;
        loop {
            match self.frame_rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => return Ok(latest),
                Err(TryRecvError::Disconnected) => {
                    return match latest {
                        Some(frame) => Ok(Some(frame)),
                        None => Err(AppError::FrameSource("capture channel closed".to_string())),
                    };
                }
            }
        }
    }
}
