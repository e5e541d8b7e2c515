use tracing::{debug, info};

use crate::config::GateConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Holding { value: u8, count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutcome {
    /// Score the UI should show, `None` until the first confirmation.
    pub displayed: Option<u8>,
    /// Set only on the tick that confirms a new score while voice output is allowed.
    pub announce: Option<u8>,
}

/// Hysteresis between the mapped score and what is shown or spoken.
#[derive(Debug, Clone)]
pub struct AnnouncementGate {
    state: GateState,
    displayed: Option<u8>,
    /// Local score that was outvoted by a remote verdict. It cannot reclaim the display.
    outvoted: Option<u8>,
    confirmations: u32,
    min_change: u8,
}

impl AnnouncementGate {
    pub fn new() -> Self {
        Self::from_config(&GateConfig::default())
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            state: GateState::Idle,
            displayed: None,
            outvoted: None,
            confirmations: config.confirmations.max(1),
            min_change: config.min_change.max(1),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn displayed(&self) -> Option<u8> {
        self.displayed
    }

    /// `voice_ready` means voice output is enabled and the user has interacted with the page.
    pub fn observe(&mut self, mapped: u8, voice_ready: bool) -> GateOutcome {
        if let Some(outvoted) = self.outvoted {
            if mapped == outvoted {
                self.state = GateState::Idle;
                return self.outcome(None);
            }
            self.outvoted = None;
        }

        let materially_different = match self.displayed {
            None => true,
            Some(shown) => mapped.abs_diff(shown) >= self.min_change,
        };

        if !materially_different {
            // The candidate fell back to what is already shown.
            self.state = GateState::Idle;
            return self.outcome(None);
        }

        self.state = match self.state {
            GateState::Holding { value, count } if value == mapped => GateState::Holding {
                value,
                count: count.saturating_add(1),
            },
            _ => GateState::Holding {
                value: mapped,
                count: 1,
            },
        };

        let GateState::Holding { value, count } = self.state else {
            return self.outcome(None);
        };
        if count < self.confirmations || self.displayed == Some(value) {
            debug!("Holding score {} ({}/{})", value, count, self.confirmations);
            return self.outcome(None);
        }

        self.displayed = Some(value);
        if voice_ready {
            info!("Score {} confirmed, announcing", value);
            self.outcome(Some(value))
        } else {
            debug!("Score {} confirmed silently", value);
            self.outcome(None)
        }
    }

    /// Adopts an externally supplied score (remote enrichment) without announcing it.
    ///
    /// `local` is the mapped score the remote verdict replaced. It stays suppressed until the
    /// local mapping moves to a different value.
    pub fn override_displayed(&mut self, score: u8, local: Option<u8>) {
        self.displayed = Some(score);
        self.state = GateState::Idle;
        self.outvoted = local.filter(|l| *l != score);
    }

    /// Lets the local score compete for the display again.
    pub fn release_override(&mut self) {
        self.outvoted = None;
    }

    pub fn reset(&mut self) {
        self.state = GateState::Idle;
        self.displayed = None;
        self.outvoted = None;
    }

    fn outcome(&self, announce: Option<u8>) -> GateOutcome {
        GateOutcome {
            displayed: self.displayed,
            announce,
        }
    }
}

impl Default for AnnouncementGate {
    fn default() -> Self {
        Self::new()
    }
}
