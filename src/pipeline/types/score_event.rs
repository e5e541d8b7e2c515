use super::Lighting;

/// Side effects requested by the scoring core. Consumers decide how to render them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    Announce(u8),
    LightingChanged { from: Lighting, to: Lighting },
    RemoteMerged { score: Option<u8> },
}
