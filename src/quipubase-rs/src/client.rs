use futures::StreamExt;
use quipubase_core::{
    infer_schema, output_schema, ActionRequest, ClientConfig, Collection, CollectionMetadata,
    CreateCollectionRequest, JsonSchema, SseEvent, Status, TransportMode, DEFAULT_BASE_URL,
};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::stream::read_lines;
use crate::subscription::Subscription;
use crate::transport::{self, EventStream, EventTransport};
use crate::{ClientError, Result};

const COLLECTIONS_ENDPOINT: &str = "/v1/collections";
const EVENTS_ENDPOINT: &str = "/v1/events";

/// Quipubase REST API Client
#[derive(Clone)]
pub struct Client {
    base_url: String,
    client: HttpClient,
    transport: Arc<dyn EventTransport>,
}

impl Client {
    /// Create a new client connected to the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: HttpClient::new(),
            transport: transport::for_mode(TransportMode::Auto),
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = HttpClient::builder().user_agent(config.user_agent.clone());
        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let transport = transport::for_mode(config.transport);
        debug!(
            "Client for {} using {} event transport",
            config.base_url,
            transport.name()
        );

        Ok(Self {
            base_url: config.base_url.clone(),
            client: builder.build()?,
            transport,
        })
    }

    /// Replace the event transport used by [`Client::subscribe`] and [`Client::events`]
    pub fn with_transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Base URL + endpoint, plus `/{id}` when an id is given. Nothing is encoded.
    pub fn build_url(&self, endpoint: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}{}/{}", self.base_url, endpoint, id),
            None => format!("{}{}", self.base_url, endpoint),
        }
    }

    async fn send_json<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }

    // Collections

    /// Create a collection from a schema definition
    pub async fn create_collection(
        &self,
        name: impl Into<String>,
        schema: JsonSchema,
    ) -> Result<CollectionMetadata> {
        let url = self.build_url(COLLECTIONS_ENDPOINT, None);
        let req = CreateCollectionRequest {
            name: name.into(),
            schema,
        };
        debug!("POST {} (collection {})", url, req.name);

        self.send_json(self.client.post(&url).json(&req)).await
    }

    /// Create a collection whose schema is inferred from a sample document
    pub async fn create_collection_from_sample(
        &self,
        name: impl Into<String>,
        sample: &Value,
    ) -> Result<CollectionMetadata> {
        let name = name.into();
        let mut schema = infer_schema(sample);
        schema.title = Some(name.clone());

        self.create_collection(name, schema).await
    }

    /// Get a collection descriptor by ID
    pub async fn get_collection(&self, id: impl AsRef<str>) -> Result<Collection> {
        let url = self.build_url(COLLECTIONS_ENDPOINT, Some(id.as_ref()));
        debug!("GET {}", url);

        self.send_json(self.client.get(&url)).await
    }

    /// Delete a collection; the server answers with a map of deletion flags
    pub async fn delete_collection(&self, id: impl AsRef<str>) -> Result<HashMap<String, bool>> {
        let url = self.build_url(COLLECTIONS_ENDPOINT, Some(id.as_ref()));
        debug!("DELETE {}", url);

        self.send_json(self.client.delete(&url)).await
    }

    /// List collections, paginated
    pub async fn list_collections(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CollectionMetadata>> {
        let url = format!(
            "{}?limit={}&offset={}",
            self.build_url(COLLECTIONS_ENDPOINT, None),
            limit,
            offset
        );
        debug!("GET {}", url);

        self.send_json(self.client.get(&url)).await
    }

    // Documents

    /// Send an action to a collection. The response is decoded as `R` without
    /// checking it against the action's expected shape.
    pub async fn dispatch<D, R>(&self, collection_id: &str, action: &ActionRequest<D>) -> Result<R>
    where
        D: Serialize,
        R: DeserializeOwned,
    {
        let url = self.build_url(COLLECTIONS_ENDPOINT, Some(collection_id));
        debug!("PUT {} (event={})", url, action.event);

        self.send_json(self.client.put(&url).json(action)).await
    }

    /// Create a document
    pub async fn create<T>(&self, collection_id: &str, data: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.dispatch(collection_id, &ActionRequest::create(data)).await
    }

    /// Read a document by ID
    pub async fn read<T: DeserializeOwned>(&self, collection_id: &str, id: &str) -> Result<T> {
        self.dispatch(collection_id, &ActionRequest::<Value>::read(id)).await
    }

    /// Update a document by ID
    pub async fn update<T>(&self, collection_id: &str, id: &str, data: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.dispatch(collection_id, &ActionRequest::update(id, data)).await
    }

    /// Delete a document by ID
    pub async fn delete(&self, collection_id: &str, id: &str) -> Result<Status> {
        self.dispatch(collection_id, &ActionRequest::<Value>::delete(id)).await
    }

    /// Query documents matching a partial document
    pub async fn query<F, T>(&self, collection_id: &str, filter: &F) -> Result<Vec<T>>
    where
        F: Serialize,
        T: DeserializeOwned,
    {
        self.dispatch(collection_id, &ActionRequest::query(filter)).await
    }

    /// Send the `stop` action to a collection
    pub async fn stop(&self, collection_id: &str) -> Result<Status> {
        self.dispatch(collection_id, &ActionRequest::<Value>::stop()).await
    }

    /// Read a document and describe its shape
    pub async fn describe_document(&self, collection_id: &str, id: &str) -> Result<JsonSchema> {
        let document: Value = self.read(collection_id, id).await?;
        Ok(output_schema("Document", collection_id, &document))
    }

    // Events

    /// Publish an event to a collection's subscribers
    pub async fn publish<D: Serialize>(
        &self,
        collection_id: &str,
        action: &ActionRequest<D>,
    ) -> Result<Status> {
        let url = self.build_url(EVENTS_ENDPOINT, Some(collection_id));
        debug!("POST {} (event={})", url, action.event);

        self.send_json(self.client.post(&url).json(action)).await
    }

    /// Open the event stream of a collection with the client's transport
    pub async fn events<T>(&self, collection_id: &str) -> Result<EventStream<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.events_with(self.transport.as_ref(), collection_id).await
    }

    /// Open the event stream of a collection with an explicit transport
    pub async fn events_with<T>(
        &self,
        transport: &dyn EventTransport,
        collection_id: &str,
    ) -> Result<EventStream<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.build_url(EVENTS_ENDPOINT, Some(collection_id));
        debug!("GET {} ({} transport)", url, transport.name());

        let raw = transport.open(&self.client, &url).await?;
        let typed = raw.map(|event| -> Result<SseEvent<T>> {
            let event = event?;
            Ok(SseEvent {
                data: serde_json::from_value::<T>(event.data)?,
                event: event.event,
            })
        });

        Ok(Box::pin(typed))
    }

    /// Subscribe to a collection's events; `callback` runs once per event
    pub async fn subscribe<T, F>(&self, collection_id: &str, callback: F) -> Result<Subscription>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(SseEvent<T>) + Send + 'static,
    {
        let events = self.events(collection_id).await?;
        Ok(Subscription::spawn(collection_id.to_string(), events, callback))
    }

    /// Subscribe with an explicit transport instead of the configured one
    pub async fn subscribe_with<T, F>(
        &self,
        transport: &dyn EventTransport,
        collection_id: &str,
        callback: F,
    ) -> Result<Subscription>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(SseEvent<T>) + Send + 'static,
    {
        let events = self.events_with(transport, collection_id).await?;
        Ok(Subscription::spawn(collection_id.to_string(), events, callback))
    }

    /// GET an endpoint and hand each meaningful body line to `on_line`.
    /// Returns the number of lines delivered.
    pub async fn stream_lines<F>(&self, endpoint: &str, on_line: F) -> Result<usize>
    where
        F: FnMut(&str),
    {
        let url = self.build_url(endpoint, None);
        debug!("GET {} (streaming)", url);

        let response = ensure_success(self.client.get(&url).send().await?).await?;
        if response.content_length() == Some(0) {
            return Err(ClientError::MissingBody);
        }

        Ok(read_lines(Box::pin(response.bytes_stream()), on_line).await?)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Turn a non-2xx response into [`ClientError::Server`], preferring the
/// message of a `Status` body when the server sent one.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await;
    Err(server_error(&url, status, body))
}

// A body that cannot be read leaves the message empty
fn server_error<E: fmt::Display>(
    url: &str,
    status: StatusCode,
    body: std::result::Result<String, E>,
) -> ClientError {
    let message = match body {
        Ok(body) => match serde_json::from_str::<Status>(&body) {
            Ok(envelope) => envelope.message,
            Err(_) => body,
        },
        Err(e) => {
            warn!("Failed to read error body from {}: {}", url, e);
            String::new()
        }
    };
    warn!("{} returned {}: {}", url, status, message);

    ClientError::Server {
        status: status.as_u16(),
        message,
    }
}
