use futures::{future, Stream, StreamExt};
use quipubase_core::{SseEvent, TransportMode};
use reqwest::header::ACCEPT;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;

use crate::client::ensure_success;
use crate::sse::SseDecoder;
use crate::stream::{framed, LineBuffer, DONE_TOKEN};
use crate::Result;

/// Stream of decoded events from `GET /v1/events/{id}`
pub type EventStream<T = Value> = Pin<Box<dyn Stream<Item = Result<SseEvent<T>>> + Send>>;

/// Transport used to subscribe to a collection's event stream
#[async_trait::async_trait]
pub trait EventTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Open the event stream at `url`; resolves once response headers arrive
    async fn open(&self, http: &HttpClient, url: &str) -> Result<EventStream>;
}

/// Server-sent events: each frame's data is one JSON-encoded event
#[derive(Debug, Default, Clone, Copy)]
pub struct PushTransport;

/// Plain chunked GET: the body is read as line-delimited JSON events
#[derive(Debug, Default, Clone, Copy)]
pub struct PullTransport;

#[async_trait::async_trait]
impl EventTransport for PushTransport {
    fn name(&self) -> &'static str {
        "push"
    }

    async fn open(&self, http: &HttpClient, url: &str) -> Result<EventStream> {
        let response = http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let frames = framed(Box::pin(response.bytes_stream()), SseDecoder::new());
        let events = frames
            .take_while(|frame| {
                let done = matches!(frame, Ok(frame) if frame.data.trim() == DONE_TOKEN);
                future::ready(!done)
            })
            .map(|frame| {
                frame.and_then(|frame| Ok(serde_json::from_str::<SseEvent>(&frame.data)?))
            });

        Ok(Box::pin(events))
    }
}

#[async_trait::async_trait]
impl EventTransport for PullTransport {
    fn name(&self) -> &'static str {
        "pull"
    }

    async fn open(&self, http: &HttpClient, url: &str) -> Result<EventStream> {
        let response = http.get(url).send().await?;
        let response = ensure_success(response).await?;

        let lines = framed(Box::pin(response.bytes_stream()), LineBuffer::new());
        let events =
            lines.map(|line| line.and_then(|line| Ok(serde_json::from_str::<SseEvent>(&line)?)));

        Ok(Box::pin(events))
    }
}

/// Pick the transport for a configured mode. `Auto` resolves to push, which
/// every reqwest build supports.
pub(crate) fn for_mode(mode: TransportMode) -> Arc<dyn EventTransport> {
    match mode {
        TransportMode::Auto | TransportMode::Push => Arc::new(PushTransport),
        TransportMode::Pull => Arc::new(PullTransport),
    }
}
