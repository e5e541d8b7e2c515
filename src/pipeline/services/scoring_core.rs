use chrono::Utc;
use tracing::{debug, info};

use super::announcement_gate::AnnouncementGate;
use super::confidence_estimator::{ConfidenceEstimator, ConfidenceInputs};
use super::pros_cons::ProsConsComposer;
use super::score_mapper::ScoreMapper;
use super::signal_smoother::{SignalSmoother, SmoothedSignal};
use crate::config::Configuration;
use crate::network::wire::EnrichmentResponse;
use crate::pipeline::types::{FrameSample, Lighting, ScoreEvent, ScoreState};

#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub state: ScoreState,
    /// Mapped score of this tick before hysteresis.
    pub mapped: u8,
    pub signal: SmoothedSignal,
    pub events: Vec<ScoreEvent>,
}

#[derive(Debug, Clone)]
struct RemoteOverlay {
    pros: Vec<String>,
    cons: Vec<String>,
    confidence: u8,
}

/// Single owner of every window and state object. Collaborators only see `ScoreState` copies.
pub struct ScoringCore {
    smoother: SignalSmoother,
    mapper: ScoreMapper,
    estimator: ConfidenceEstimator,
    composer: ProsConsComposer,
    gate: AnnouncementGate,
    state: ScoreState,
    last_lighting: Option<Lighting>,
    last_mapped: Option<u8>,
    overlay: Option<RemoteOverlay>,
    voice_enabled: bool,
    user_interacted: bool,
}

impl ScoringCore {
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            smoother: SignalSmoother::from_config(
                &configuration.smoothing,
                &configuration.lighting,
            ),
            mapper: ScoreMapper,
            estimator: ConfidenceEstimator::from_config(&configuration.confidence),
            composer: ProsConsComposer,
            gate: AnnouncementGate::from_config(&configuration.gate),
            state: ScoreState::default(),
            last_lighting: None,
            last_mapped: None,
            overlay: None,
            voice_enabled: configuration.gate.voice_enabled,
            user_interacted: false,
        }
    }

    pub fn with_voice(mut self, enabled: bool) -> Self {
        self.voice_enabled = enabled;
        self
    }

    pub fn set_voice_enabled(&mut self, enabled: bool) {
        self.voice_enabled = enabled;
    }

    /// Audio playback is only allowed after the user has interacted with the page.
    pub fn mark_user_interaction(&mut self) {
        self.user_interacted = true;
    }

    fn voice_ready(&self) -> bool {
        self.voice_enabled && self.user_interacted
    }

    pub fn tick(&mut self, sample: &FrameSample) -> TickOutcome {
        let signal = self.smoother.update(sample);
        let mapped = self.mapper.map(signal.value);
        self.last_mapped = Some(mapped);
        let confidence = self.estimator.estimate(&ConfidenceInputs {
            green_dominance: sample.green_dominance(),
            chroma_spread: sample.chroma_spread(),
            stability: signal.stability,
            history_len: signal.history_len,
            lighting: signal.lighting,
            variance: signal.variance,
        });

        let mut events = Vec::new();
        if let Some(previous) = self.last_lighting {
            if previous != signal.lighting {
                info!("Lighting changed: {} -> {}", previous.label(), signal.lighting.label());
                events.push(ScoreEvent::LightingChanged {
                    from: previous,
                    to: signal.lighting,
                });
            }
        }
        self.last_lighting = Some(signal.lighting);

        let gate = self.gate.observe(mapped, self.voice_ready());
        if let Some(score) = gate.announce {
            events.push(ScoreEvent::Announce(score));
        }
        let score = gate.displayed.unwrap_or(mapped);

        let (pros, cons) = self.composer.compose(score, sample, signal.lighting);
        let mut state = ScoreState {
            score,
            confidence: ConfidenceEstimator::to_percent(confidence),
            lighting: signal.lighting,
            advisories: signal
                .lighting
                .advisory()
                .map(|a| vec![a.to_string()])
                .unwrap_or_default(),
            pros,
            cons,
            timestamp: Utc::now().timestamp_millis(),
        };
        if let Some(overlay) = &self.overlay {
            state.pros = overlay.pros.clone();
            state.cons = overlay.cons.clone();
            state.confidence = overlay.confidence;
        }

        debug!(
            "Tick: raw={:.3} smoothed={:.3} mapped={} shown={} confidence={:.2}",
            signal.raw_score, signal.value, mapped, score, confidence
        );
        self.state = state.clone();

        TickOutcome {
            state,
            mapped,
            signal,
            events,
        }
    }

    /// Merges a sanitized remote verdict. The score only moves on a material difference.
    pub fn apply_remote(&mut self, response: &EnrichmentResponse) -> ScoreEvent {
        let score = response.score.clamp(ScoreMapper::MIN_SCORE, ScoreMapper::MAX_SCORE);
        let merged = if score.abs_diff(self.state.score) >= 1 {
            self.gate.override_displayed(score, self.last_mapped);
            self.state.score = score;
            Some(score)
        } else {
            None
        };

        let overlay = RemoteOverlay {
            pros: response.pros.clone(),
            cons: response.cons.clone(),
            confidence: response.confidence.min(100),
        };
        self.state.pros = overlay.pros.clone();
        self.state.cons = overlay.cons.clone();
        self.state.confidence = overlay.confidence;
        self.state.timestamp = Utc::now().timestamp_millis();
        self.overlay = Some(overlay);

        info!("Merged remote verdict from {}: score={:?}", response.model, merged);
        ScoreEvent::RemoteMerged { score: merged }
    }

    /// Drops any remote pros/cons/confidence so the local heuristic shows through again.
    pub fn clear_remote(&mut self) {
        self.overlay = None;
        self.gate.release_override();
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
        self.gate.reset();
        self.state = ScoreState::default();
        self.last_lighting = None;
        self.last_mapped = None;
        self.overlay = None;
    }

    pub fn snapshot(&self) -> ScoreState {
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> ScoringCore {
        ScoringCore::new(&Configuration::default())
    }

    fn green_sample() -> FrameSample {
        FrameSample::new(0.10, 0.60, 0.15, 0.46, 0.01)
    }

    fn remote(score: u8) -> EnrichmentResponse {
        EnrichmentResponse {
            score,
            pros: vec!["High fiber".to_string()],
            cons: vec![],
            confidence: 88,
            model: "vision-test".to_string(),
            barcode: None,
            ts: 0,
        }
    }

    #[test]
    fn sustained_green_scene_maps_to_seven() {
        let mut core = core();
        let mut outcome = core.tick(&green_sample());
        for _ in 1..10 {
            outcome = core.tick(&green_sample());
        }
        assert_eq!(outcome.mapped, 7);
        assert_eq!(outcome.state.score, 7);
        assert!(outcome.state.confidence > 60);
        assert_eq!(outcome.state.lighting, Lighting::Ok);
        assert!(outcome.state.advisories.is_empty());
    }

    #[test]
    fn score_and_confidence_stay_in_range() {
        let mut core = core();
        let samples = [
            FrameSample::new(1.0, 0.0, 0.0, 0.02, 0.0),
            FrameSample::new(0.0, 1.0, 0.0, 0.95, 0.5),
            FrameSample::new(0.0, 0.0, 0.0, 0.0, 0.0),
            FrameSample::new(0.5, 0.5, 0.5, 0.5, 0.001),
        ];
        for i in 0..120 {
            let outcome = core.tick(&samples[i % samples.len()]);
            assert!((1..=10).contains(&outcome.state.score));
            assert!((20..=100).contains(&outcome.state.confidence));
        }
    }

    #[test]
    fn announces_only_when_voice_is_ready() {
        let mut core = core();
        core.set_voice_enabled(true);
        let events: Vec<ScoreEvent> = (0..3)
            .flat_map(|_| core.tick(&green_sample()).events)
            .collect();
        assert!(!events.iter().any(|e| matches!(e, ScoreEvent::Announce(_))));

        let mut core = ScoringCore::new(&Configuration::default()).with_voice(true);
        core.mark_user_interaction();
        let announced: Vec<ScoreEvent> = (0..5)
            .flat_map(|_| core.tick(&green_sample()).events)
            .filter(|e| matches!(e, ScoreEvent::Announce(_)))
            .collect();
        assert_eq!(announced, vec![ScoreEvent::Announce(7)]);
    }

    #[test]
    fn dark_scene_emits_advisory_and_lighting_event() {
        let mut core = core();
        core.tick(&green_sample());
        let dark = FrameSample::new(0.10, 0.60, 0.15, 0.0, 0.01);
        let mut events = Vec::new();
        let mut last = None;
        for _ in 0..10 {
            let outcome = core.tick(&dark);
            events.extend(outcome.events);
            last = Some(outcome.state);
        }
        let state = last.unwrap();
        assert_eq!(state.lighting, Lighting::TooDark);
        assert_eq!(state.advisories, vec!["Increase lighting".to_string()]);
        assert!(events.contains(&ScoreEvent::LightingChanged {
            from: Lighting::Ok,
            to: Lighting::TooDark,
        }));
    }

    #[test]
    fn remote_verdict_overrides_materially_different_score() {
        let mut core = core();
        for _ in 0..3 {
            core.tick(&green_sample());
        }
        let event = core.apply_remote(&remote(3));
        assert_eq!(event, ScoreEvent::RemoteMerged { score: Some(3) });
        let state = core.snapshot();
        assert_eq!(state.score, 3);
        assert_eq!(state.confidence, 88);
        assert_eq!(state.pros, vec!["High fiber".to_string()]);

        let event = core.apply_remote(&remote(3));
        assert_eq!(event, ScoreEvent::RemoteMerged { score: None });
    }

    #[test]
    fn remote_score_holds_against_unchanged_local_reading() {
        let mut core = core().with_voice(true);
        core.mark_user_interaction();
        for _ in 0..3 {
            core.tick(&green_sample());
        }
        core.apply_remote(&remote(3));
        for _ in 0..10 {
            let outcome = core.tick(&green_sample());
            assert_eq!(outcome.mapped, 7);
            assert_eq!(outcome.state.score, 3);
            assert!(outcome.events.is_empty());
        }

        core.clear_remote();
        let shown: Vec<u8> = (0..2).map(|_| core.tick(&green_sample()).state.score).collect();
        assert_eq!(shown, vec![3, 7]);
    }

    #[test]
    fn remote_overlay_survives_local_ticks_until_cleared() {
        let mut core = core();
        core.tick(&green_sample());
        core.apply_remote(&remote(7));
        let state = core.tick(&green_sample()).state;
        assert_eq!(state.pros, vec!["High fiber".to_string()]);
        core.clear_remote();
        let state = core.tick(&green_sample()).state;
        assert!(state.pros.contains(&"Strong green presence".to_string()));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut core = core();
        core.tick(&green_sample());
        core.reset();
        assert_eq!(core.snapshot(), ScoreState::default());
    }
}
