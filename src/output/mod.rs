pub mod voice;

pub use voice::{TracingVoice, VoiceOutput};
