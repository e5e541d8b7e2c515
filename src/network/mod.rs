pub mod backoff;
pub mod client;
pub mod endpoint;
pub mod frame_encoder;
pub mod vision_model;
pub mod wire;

pub use backoff::RemoteCallState;
pub use client::{EnrichmentCall, EnrichmentClient, EnrichmentTransport, HttpTransport};
pub use endpoint::{EndpointRequest, EndpointResponse, EnrichmentEndpoint};
pub use frame_encoder::FrameEncoder;
pub use vision_model::{HttpVisionModel, VisionModel};
pub use wire::{EnrichmentRequest, EnrichmentResponse};
