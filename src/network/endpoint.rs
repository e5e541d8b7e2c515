use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::limit::ConcurrencyLimit;
use tower::{Service, ServiceBuilder};
use tracing::{debug, warn};

use super::vision_model::{parse_model_output, HttpVisionModel, VisionModel};
use super::wire::{
    sanitize_response, truncate, EnrichmentRequest, EnrichmentResponse, MAX_BARCODE_CHARS,
};
use crate::config::EndpointConfig;
use crate::error::AppError;

pub const MOCK_MODEL: &str = "mock-heuristic";

#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub method: Method,
    pub body: Vec<u8>,
}

impl EndpointRequest {
    pub fn post(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::POST,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl EndpointResponse {
    fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    fn verdict(response: &EnrichmentResponse) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!(response),
        }
    }
}

/// Server side of the enrichment contract.
///
/// Whatever the upstream model returns, the body sent back has gone through
/// `sanitize_response`. Output that cannot be parsed yields a fixed mock verdict tagged
/// `mock-heuristic` so callers can tell it apart from genuine model output.
#[derive(Clone)]
pub struct EnrichmentEndpoint {
    model: Arc<dyn VisionModel>,
    api_key: Option<String>,
    max_payload_bytes: usize,
}

impl EnrichmentEndpoint {
    pub fn new(config: &EndpointConfig, model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    /// Builds the endpoint over an `HttpVisionModel` at `upstream_url`.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, AppError> {
        let model = HttpVisionModel::new(config.upstream_url.clone(), config.model_name.clone())?;
        Ok(Self::new(config, Arc::new(model)))
    }

    /// Wraps the endpoint with the configured concurrency limit.
    pub fn into_service(self, config: &EndpointConfig) -> ConcurrencyLimit<Self> {
        ServiceBuilder::new()
            .concurrency_limit(config.max_concurrent_requests.max(1))
            .service(self)
    }

    pub async fn handle(&self, request: EndpointRequest) -> EndpointResponse {
        if request.method != Method::POST {
            return EndpointResponse::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        }

        let Ok(payload) = serde_json::from_slice::<EnrichmentRequest>(&request.body) else {
            return EndpointResponse::error(StatusCode::BAD_REQUEST, "Invalid JSON body");
        };

        let encoded = strip_data_url(&payload.image_base64);
        let Ok(image) = BASE64.decode(encoded) else {
            return EndpointResponse::error(StatusCode::BAD_REQUEST, "Invalid image payload");
        };
        if image.len() > self.max_payload_bytes {
            debug!("Rejecting {} byte payload", image.len());
            return EndpointResponse::error(StatusCode::PAYLOAD_TOO_LARGE, "Image too large");
        }

        let Some(api_key) = self.api_key.as_deref() else {
            return EndpointResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Missing upstream credential",
            );
        };

        let barcode = payload
            .barcode
            .as_deref()
            .map(|b| truncate(b.trim(), MAX_BARCODE_CHARS))
            .filter(|b| !b.is_empty());

        if !payload.use_model {
            return EndpointResponse::verdict(&mock_response(barcode));
        }

        let output = match self
            .model
            .describe(api_key, encoded, barcode.as_deref())
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Upstream model {} failed: {}", self.model.name(), e);
                return EndpointResponse::error(StatusCode::BAD_GATEWAY, "Upstream model failed");
            }
        };

        let Some(mut value) = output.as_deref().and_then(parse_model_output) else {
            warn!("Upstream model {} gave no usable output", self.model.name());
            return EndpointResponse::verdict(&mock_response(barcode));
        };

        if let Value::Object(fields) = &mut value {
            fields.insert("model".to_string(), json!(self.model.name()));
            fields.insert("barcode".to_string(), json!(barcode));
            fields.insert("ts".to_string(), json!(Utc::now().timestamp_millis()));
        }
        EndpointResponse::verdict(&sanitize_response(&value))
    }
}

impl Service<EndpointRequest> for EnrichmentEndpoint {
    type Response = EndpointResponse;
    type Error = AppError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: EndpointRequest) -> Self::Future {
        let endpoint = self.clone();
        Box::pin(async move { Ok(endpoint.handle(request).await) })
    }
}

fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload.trim(),
    }
}

/// Fixed verdict used when the model is skipped or its output is unusable.
pub fn mock_response(barcode: Option<String>) -> EnrichmentResponse {
    EnrichmentResponse {
        score: 5,
        pros: vec!["Colorful ingredients detected".to_string()],
        cons: vec!["Model output unavailable, heuristic estimate only".to_string()],
        confidence: 35,
        model: MOCK_MODEL.to_string(),
        barcode,
        ts: Utc::now().timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use async_trait::async_trait;
    use tower::ServiceExt;

    struct FixedModel {
        output: Result<Option<String>, RemoteError>,
    }

    #[async_trait]
    impl VisionModel for FixedModel {
        fn name(&self) -> &str {
            "fixed-vision"
        }

        async fn describe(
            &self,
            _api_key: &str,
            _image_base64: &str,
            _barcode: Option<&str>,
        ) -> Result<Option<String>, RemoteError> {
            self.output.clone()
        }
    }

    fn endpoint(
        output: Result<Option<String>, RemoteError>,
        api_key: Option<&str>,
    ) -> EnrichmentEndpoint {
        let config = EndpointConfig {
            api_key: api_key.map(str::to_string),
            ..EndpointConfig::default()
        };
        EnrichmentEndpoint::new(&config, Arc::new(FixedModel { output }))
    }

    fn body(image_bytes: usize, barcode: Option<&str>) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "image_base64": BASE64.encode(vec![7u8; image_bytes]),
            "barcode": barcode,
            "use_model": true,
        }))
        .unwrap()
    }

    fn model_text(text: &str) -> Result<Option<String>, RemoteError> {
        Ok(Some(text.to_string()))
    }

    #[tokio::test]
    async fn non_post_is_rejected() {
        let response = endpoint(model_text("{}"), Some("key"))
            .handle(EndpointRequest {
                method: Method::GET,
                body: Vec::new(),
            })
            .await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn oversized_payload_is_413() {
        let response = endpoint(model_text("{}"), Some("key"))
            .handle(EndpointRequest::post(body(400_001, None)))
            .await;
        assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);

        let response = endpoint(model_text(r#"{"score": 6}"#), Some("key"))
            .handle(EndpointRequest::post(body(400_000, None)))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_credential_is_500() {
        let response = endpoint(model_text("{}"), None)
            .handle(EndpointRequest::post(body(16, None)))
            .await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let endpoint = endpoint(model_text("{}"), Some("key"));
        let response = endpoint.handle(EndpointRequest::post("not json")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = endpoint
            .handle(EndpointRequest::post(r#"{"image_base64": "%%%"}"#))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unparseable_model_output_falls_back_to_mock() {
        for output in [model_text("I think it's healthy!"), Ok(None)] {
            let response = endpoint(output, Some("key"))
                .handle(EndpointRequest::post(body(16, Some("12345"))))
                .await;
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body["model"], MOCK_MODEL);
            assert_eq!(response.body["barcode"], "12345");
        }
    }

    #[tokio::test]
    async fn model_output_is_sanitized_and_tagged() {
        let text = r#"```json
{"score": 15, "pros": ["Greens", 3, "Beans", "a", "b", "c", "d", "e"],
 "cons": null, "confidence": 180, "model": "spoofed"}
```"#;
        let response = endpoint(model_text(text), Some("key"))
            .handle(EndpointRequest::post(body(16, None)))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        let verdict: EnrichmentResponse = serde_json::from_value(response.body).unwrap();
        assert_eq!(verdict.score, 10);
        assert_eq!(verdict.confidence, 100);
        assert_eq!(verdict.pros.len(), 6);
        assert_eq!(verdict.pros[1], "Beans");
        assert!(verdict.cons.is_empty());
        assert_eq!(verdict.model, "fixed-vision");
        assert!(verdict.barcode.is_none());
    }

    #[tokio::test]
    async fn configured_endpoint_talks_to_http_model() {
        let config = EndpointConfig {
            api_key: Some("key".to_string()),
            // nothing listens on the discard port
            upstream_url: "http://127.0.0.1:9/v1/describe".to_string(),
            ..EndpointConfig::default()
        };
        let endpoint = EnrichmentEndpoint::from_config(&config).unwrap();
        assert_eq!(endpoint.model.name(), "healthscan-vision");

        let response = endpoint.handle(EndpointRequest::post(body(16, None))).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);

        let skipped = json!({ "image_base64": BASE64.encode([1u8]), "use_model": false });
        let response = endpoint
            .handle(EndpointRequest::post(serde_json::to_vec(&skipped).unwrap()))
            .await;
        assert_eq!(response.body["model"], MOCK_MODEL);
    }

    #[tokio::test]
    async fn configured_endpoint_without_key_is_500() {
        let endpoint = EnrichmentEndpoint::from_config(&EndpointConfig::default()).unwrap();
        let response = endpoint.handle(EndpointRequest::post(body(16, None))).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let response = endpoint(Err(RemoteError::Transport("refused".to_string())), Some("key"))
            .handle(EndpointRequest::post(body(16, None)))
            .await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn data_url_prefix_is_accepted_through_the_service() {
        let payload = json!({
            "image_base64": format!("data:image/jpeg;base64,{}", BASE64.encode([1u8, 2, 3])),
            "use_model": false,
        });
        let service =
            endpoint(model_text("{}"), Some("key")).into_service(&EndpointConfig::default());
        let response = service
            .oneshot(EndpointRequest::post(serde_json::to_vec(&payload).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["model"], MOCK_MODEL);
    }
}
