use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_LIST_ITEMS: usize = 6;
pub const MAX_ITEM_CHARS: usize = 160;
pub const MAX_MODEL_CHARS: usize = 64;
pub const MAX_BARCODE_CHARS: usize = 64;
const NEUTRAL_SCORE: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentRequest {
    pub image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default = "default_use_model")]
    pub use_model: bool,
}

fn default_use_model() -> bool {
    true
}

/// A verdict that has already been through `sanitize_response`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentResponse {
    pub score: u8,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub confidence: u8,
    pub model: String,
    pub barcode: Option<String>,
    pub ts: i64,
}

/// Coerces any JSON shape into a response whose fields are within their valid ranges.
///
/// Lists keep string entries only, at most `MAX_LIST_ITEMS` of them, each cut to
/// `MAX_ITEM_CHARS`. Numbers may arrive as JSON numbers or numeric strings.
pub fn sanitize_response(value: &Value) -> EnrichmentResponse {
    let score = number(value.get("score"))
        .map(|s| s.round().clamp(1.0, 10.0) as u8)
        .unwrap_or(NEUTRAL_SCORE);
    let confidence = number(value.get("confidence"))
        .map(|c| c.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0);
    let model = value
        .get("model")
        .and_then(Value::as_str)
        .map(|m| truncate(m.trim(), MAX_MODEL_CHARS))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let barcode = value
        .get("barcode")
        .and_then(Value::as_str)
        .map(|b| truncate(b.trim(), MAX_BARCODE_CHARS))
        .filter(|b| !b.is_empty());
    let ts = value
        .get("ts")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    EnrichmentResponse {
        score,
        pros: string_list(value.get("pros")),
        cons: string_list(value.get("cons")),
        confidence,
        model,
        barcode,
        ts,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| truncate(s, MAX_ITEM_CHARS))
                .take(MAX_LIST_ITEMS)
                .collect()
        })
        .unwrap_or_default()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
