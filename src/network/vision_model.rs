use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{AppError, RemoteError};

pub const PROMPT: &str = "Rate how healthy the food in this image is on a 1-10 scale. \
Reply with JSON only: {\"score\": int, \"pros\": [string], \"cons\": [string], \
\"confidence\": int 0-100}.";

/// The upstream model behind the enrichment endpoint.
#[async_trait]
pub trait VisionModel: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the model's text output, or `None` when it produced nothing usable.
    async fn describe(
        &self,
        api_key: &str,
        image_base64: &str,
        barcode: Option<&str>,
    ) -> Result<Option<String>, RemoteError>;
}

/// Calls a JSON-over-HTTP model that answers with `{"output": "..."}`.
pub struct HttpVisionModel {
    client: reqwest::Client,
    url: String,
    name: String,
}

impl HttpVisionModel {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            name: name.into(),
        })
    }
}

#[async_trait]
impl VisionModel for HttpVisionModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn describe(
        &self,
        api_key: &str,
        image_base64: &str,
        barcode: Option<&str>,
    ) -> Result<Option<String>, RemoteError> {
        let body = json!({
            "model": self.name,
            "prompt": PROMPT,
            "image_base64": image_base64,
            "barcode": barcode,
        });
        debug!("Calling upstream model {} at {}", self.name, self.url);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        let value: Value = response.json().await?;
        Ok(value
            .get("output")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

/// Pulls the first JSON object out of free-form model text (fences, prose around it, ...).
pub fn parse_model_output(text: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
