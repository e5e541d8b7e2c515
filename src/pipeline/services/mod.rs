pub mod announcement_gate;
pub mod confidence_estimator;
pub mod frame_sampler;
pub mod lighting_classifier;
pub mod pros_cons;
pub mod rolling_window;
pub mod score_mapper;
pub mod scoring_core;
pub mod signal_smoother;

pub use announcement_gate::{AnnouncementGate, GateOutcome, GateState};
pub use confidence_estimator::{ConfidenceEstimator, ConfidenceInputs};
pub use frame_sampler::FrameSampler;
pub use lighting_classifier::LightingClassifier;
pub use pros_cons::ProsConsComposer;
pub use rolling_window::RollingWindow;
pub use score_mapper::ScoreMapper;
pub use scoring_core::{ScoringCore, TickOutcome};
pub use signal_smoother::{SignalSmoother, SmoothedSignal};
