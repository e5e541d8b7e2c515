use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::backoff::RemoteCallState;
use super::frame_encoder::FrameEncoder;
use super::wire::{sanitize_response, EnrichmentRequest, EnrichmentResponse};
use crate::config::RemoteConfig;
use crate::error::{AppError, RemoteError};
use crate::pipeline::types::{RawFrame, RemoteStatus};

/// Delivers an enrichment request and returns the endpoint's raw JSON body.
#[async_trait]
pub trait EnrichmentTransport: Send + Sync {
    async fn submit(&self, request: &EnrichmentRequest) -> Result<Value, RemoteError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, AppError> {
        // No explicit timeout: failures surface as rejections or non-success statuses.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EnrichmentTransport for HttpTransport {
    async fn submit(&self, request: &EnrichmentRequest) -> Result<Value, RemoteError> {
        debug!("Posting enrichment request to {}", self.endpoint);
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        Ok(response.json::<Value>().await?)
    }
}

/// One in-flight request, detached from the client so it can run on its own task.
pub struct EnrichmentCall {
    transport: Arc<dyn EnrichmentTransport>,
    request: EnrichmentRequest,
}

impl EnrichmentCall {
    pub async fn send(self) -> Result<Value, RemoteError> {
        self.transport.submit(&self.request).await
    }

    pub fn request(&self) -> &EnrichmentRequest {
        &self.request
    }
}

/// Throttled, backoff-protected caller for the remote scoring service.
pub struct EnrichmentClient {
    transport: Arc<dyn EnrichmentTransport>,
    encoder: FrameEncoder,
    state: RemoteCallState,
    use_model: bool,
    enabled: bool,
}

impl EnrichmentClient {
    pub fn new(config: &RemoteConfig, transport: Arc<dyn EnrichmentTransport>) -> Self {
        Self {
            transport,
            encoder: FrameEncoder::from_config(config),
            state: RemoteCallState::from_config(config),
            use_model: config.use_model,
            enabled: config.enabled,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, AppError> {
        let transport = HttpTransport::new(config.endpoint_url.clone())?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn should_start(&self, now: Instant, online: bool) -> bool {
        self.enabled && online && self.state.can_attempt(now)
    }

    /// Starts an attempt if allowed. Encode failures count as failed attempts.
    pub fn try_begin(
        &mut self,
        frame: &RawFrame,
        barcode: Option<String>,
        now: Instant,
        online: bool,
    ) -> Option<EnrichmentCall> {
        if !self.should_start(now, online) || !self.state.begin(now) {
            return None;
        }
        match self.encoder.encode(frame) {
            Ok(image_base64) => {
                info!("Starting remote enrichment for frame {}", frame.id);
                Some(EnrichmentCall {
                    transport: Arc::clone(&self.transport),
                    request: EnrichmentRequest {
                        image_base64,
                        barcode,
                        use_model: self.use_model,
                    },
                })
            }
            Err(e) => {
                warn!("Could not encode frame {}: {}", frame.id, e);
                self.state.record_failure(&RemoteError::Encode(e.to_string()));
                None
            }
        }
    }

    /// Settles the in-flight attempt. Returns the sanitized verdict on success.
    pub fn complete(&mut self, result: Result<Value, RemoteError>) -> Option<EnrichmentResponse> {
        match result {
            Ok(body) => {
                let response = sanitize_response(&body);
                self.state.record_success(&response.model);
                Some(response)
            }
            Err(e) => {
                self.state.record_failure(&e);
                None
            }
        }
    }

    pub fn status(&self) -> RemoteStatus {
        self.state.status()
    }

    pub fn call_state(&self) -> &RemoteCallState {
        &self.state
    }
}
