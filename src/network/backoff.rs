use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::pipeline::types::RemoteStatus;

/// Throttle and backoff bookkeeping for the remote enrichment call.
///
/// An attempt may start once `base_interval + backoff` has elapsed since the previous
/// attempt and nothing is in flight. Failures double the backoff (starting at the floor,
/// capped at the ceiling); a success resets it to zero.
#[derive(Debug, Clone)]
pub struct RemoteCallState {
    pending: bool,
    last_attempt: Option<Instant>,
    backoff: Duration,
    last_error: Option<String>,
    model: Option<String>,
    base_interval: Duration,
    backoff_floor: Duration,
    backoff_ceiling: Duration,
}

impl RemoteCallState {
    pub fn new() -> Self {
        Self::from_config(&RemoteConfig::default())
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            pending: false,
            last_attempt: None,
            backoff: Duration::ZERO,
            last_error: None,
            model: None,
            base_interval: config.base_interval(),
            backoff_floor: config.backoff_floor(),
            backoff_ceiling: config.backoff_ceiling(),
        }
    }

    pub fn can_attempt(&self, now: Instant) -> bool {
        if self.pending {
            return false;
        }
        match self.last_attempt {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.base_interval + self.backoff,
        }
    }

    /// Marks a call as in flight. Returns `false` (and changes nothing) when throttled.
    pub fn begin(&mut self, now: Instant) -> bool {
        if !self.can_attempt(now) {
            return false;
        }
        self.pending = true;
        self.last_attempt = Some(now);
        true
    }

    pub fn record_success(&mut self, model: &str) {
        if self.backoff > Duration::ZERO {
            debug!("Remote call recovered, clearing {:?} backoff", self.backoff);
        }
        self.pending = false;
        self.backoff = Duration::ZERO;
        self.last_error = None;
        self.model = Some(model.to_string());
    }

    pub fn record_failure(&mut self, error: &RemoteError) {
        self.pending = false;
        self.backoff = (self.backoff * 2)
            .max(self.backoff_floor)
            .min(self.backoff_ceiling);
        self.last_error = Some(error.to_string());
        warn!("Remote call failed: {}; backing off {:?}", error, self.backoff);
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn status(&self) -> RemoteStatus {
        RemoteStatus {
            pending: self.pending,
            last_error: self.last_error.clone(),
            model: self.model.clone(),
        }
    }
}

impl Default for RemoteCallState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> RemoteError {
        RemoteError::Status(503)
    }

    #[test]
    fn first_attempt_is_allowed_and_blocks_a_second() {
        let mut state = RemoteCallState::new();
        let now = Instant::now();
        assert!(state.begin(now));
        assert!(state.is_pending());
        assert!(!state.begin(now + Duration::from_secs(100)));
    }

    #[test]
    fn throttles_to_base_interval() {
        let mut state = RemoteCallState::new();
        let start = Instant::now();
        assert!(state.begin(start));
        state.record_success("vision-1");
        assert!(!state.can_attempt(start + Duration::from_millis(2499)));
        assert!(state.can_attempt(start + Duration::from_millis(2500)));
    }

    #[test]
    fn backoff_doubles_to_ceiling_then_resets() {
        let mut state = RemoteCallState::new();
        let mut now = Instant::now();
        let mut observed = Vec::new();
        for _ in 0..8 {
            assert!(state.begin(now));
            state.record_failure(&failure());
            observed.push(state.backoff().as_secs());
            now += Duration::from_millis(2500) + state.backoff();
        }
        assert_eq!(observed, vec![2, 4, 8, 16, 32, 60, 60, 60]);

        assert!(state.begin(now));
        state.record_success("vision-1");
        assert_eq!(state.backoff(), Duration::ZERO);
        assert!(state.status().last_error.is_none());
    }

    #[test]
    fn failure_extends_the_wait() {
        let mut state = RemoteCallState::new();
        let start = Instant::now();
        state.begin(start);
        state.record_failure(&failure());
        assert!(!state.can_attempt(start + Duration::from_millis(4499)));
        assert!(state.can_attempt(start + Duration::from_millis(4500)));
    }

    #[test]
    fn status_reports_error_and_model() {
        let mut state = RemoteCallState::new();
        state.begin(Instant::now());
        assert!(state.status().pending);
        state.record_failure(&failure());
        let status = state.status();
        assert!(!status.pending);
        assert!(status.last_error.unwrap().contains("503"));

        state.record_success("vision-2");
        assert_eq!(state.status().model.as_deref(), Some("vision-2"));
    }
}
