mod frame_sample;
mod raw_frame;
mod score_event;
mod score_state;

pub use frame_sample::FrameSample;
pub use raw_frame::RawFrame;
pub use score_event::ScoreEvent;
pub use score_state::{Lighting, RemoteStatus, ScoreSnapshot, ScoreState};
