//! Quipubase Client Library
//!
//! HTTP client for the Quipubase document-collection service: collection
//! management, document dispatch (create/read/update/delete/query) and event
//! pub/sub over a streaming response.

mod client;
mod sse;
mod stream;
mod subscription;
mod transport;

pub use client::Client;
pub use quipubase_core::{
    infer_schema, output_schema, ActionRequest, ClientConfig, Collection, CollectionMetadata,
    Event, JsonSchema, SseEvent, Status, TransportMode, DEFAULT_BASE_URL,
};
pub use sse::{SseDecoder, SseFrame};
pub use stream::{read_lines, FrameDecoder, LineBuffer, DONE_TOKEN};
pub use subscription::Subscription;
pub use transport::{EventStream, EventTransport, PullTransport, PushTransport};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Response has no body to stream")]
    MissingBody,
}

pub type Result<T> = std::result::Result<T, ClientError>;
