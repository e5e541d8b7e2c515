use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum Lighting {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Too Dark")]
    TooDark,
    #[serde(rename = "Too Bright")]
    TooBright,
    #[serde(rename = "Low Texture")]
    LowTexture,
}

impl Lighting {
    pub fn label(&self) -> &'static str {
        match self {
            Lighting::Ok => "OK",
            Lighting::TooDark => "Too Dark",
            Lighting::TooBright => "Too Bright",
            Lighting::LowTexture => "Low Texture",
        }
    }

    pub fn advisory(&self) -> Option<&'static str> {
        match self {
            Lighting::Ok => None,
            Lighting::TooDark => Some("Increase lighting"),
            Lighting::TooBright => Some("Reduce glare"),
            Lighting::LowTexture => Some("Move closer or adjust focus"),
        }
    }

    pub fn is_degraded(&self) -> bool {
        *self != Lighting::Ok
    }
}

/// The merged, display-ready result of the latest tick.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreState {
    pub score: u8,
    /// Percentage in [0, 100].
    pub confidence: u8,
    pub lighting: Lighting,
    pub advisories: Vec<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub timestamp: i64,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            score: 1,
            confidence: 0,
            lighting: Lighting::Ok,
            advisories: Vec::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            timestamp: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RemoteStatus {
    pub pending: bool,
    pub last_error: Option<String>,
    pub model: Option<String>,
}

/// Everything the UI is allowed to see. Window internals never leave the core.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScoreSnapshot {
    #[serde(flatten)]
    pub state: ScoreState,
    pub remote: RemoteStatus,
    /// Latest frame acquisition failure, cleared once the source answers again.
    pub source_error: Option<String>,
}
