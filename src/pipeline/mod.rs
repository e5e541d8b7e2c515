pub mod services;
pub mod types;

pub use services::{FrameSampler, ScoringCore, TickOutcome};
pub use types::{
    FrameSample, Lighting, RawFrame, RemoteStatus, ScoreEvent, ScoreSnapshot, ScoreState,
};
