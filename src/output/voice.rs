use tracing::info;

/// Renders an approved announcement. Called at most once per announce event.
pub trait VoiceOutput: Send {
    fn announce(&mut self, score: u8);
}

/// Voice sink for headless runs: the announcement goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingVoice;

impl VoiceOutput for TracingVoice {
    fn announce(&mut self, score: u8) {
        info!("Health score {} out of 10", score);
    }
}
