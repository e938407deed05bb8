use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Event tag carried by every dispatch and publish request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Create,
    Read,
    Update,
    Delete,
    Query,
    Stop,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Create => "create",
            Event::Read => "read",
            Event::Update => "update",
            Event::Delete => "delete",
            Event::Query => "query",
            Event::Stop => "stop",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Event::Create),
            "read" => Ok(Event::Read),
            "update" => Ok(Event::Update),
            "delete" => Ok(Event::Delete),
            "query" => Ok(Event::Query),
            "stop" => Ok(Event::Stop),
            other => Err(format!("unknown event tag: {}", other)),
        }
    }
}

/// ActionRequest is the body of every document dispatch (`PUT /v1/collections/{id}`)
/// and every event publish (`POST /v1/events/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRequest<T = Value> {
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionRequest<T> {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            id: None,
            data: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    pub fn create(data: T) -> Self {
        Self::new(Event::Create).with_data(data)
    }

    pub fn read(id: impl Into<String>) -> Self {
        Self::new(Event::Read).with_id(id)
    }

    pub fn update(id: impl Into<String>, data: T) -> Self {
        Self::new(Event::Update).with_id(id).with_data(data)
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(Event::Delete).with_id(id)
    }

    /// Query carries a partial document as filter
    pub fn query(filter: T) -> Self {
        Self::new(Event::Query).with_data(filter)
    }

    pub fn stop() -> Self {
        Self::new(Event::Stop)
    }
}

/// Generic result/error envelope returned by the service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<JsonSchema>,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// CollectionMetadata identifies a remote collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub id: String,
    pub name: String,
}

/// Collection describes a remote collection including its schema definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub definition: JsonSchema,
}

impl Collection {
    pub fn metadata(&self) -> CollectionMetadata {
        CollectionMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Body of `POST /v1/collections`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub schema: JsonSchema,
}

/// Minimal self-referential schema descriptor.
///
/// `schema_type` holds a JSON runtime type label ("object", "array", "number",
/// "string", "boolean", "undefined") rather than a strict JSON Schema keyword.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JsonSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, JsonSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
}

impl JsonSchema {
    pub fn of_type(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// True for the empty `{}` schema
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// SseEvent is one decoded message from the event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SseEvent<T = Value> {
    pub data: T,
    pub event: String,
}

impl<T> SseEvent<T> {
    /// Event tag as a typed [`Event`], if it is one of the known tags
    pub fn kind(&self) -> Option<Event> {
        self.event.parse().ok()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SseEvent<U> {
        SseEvent {
            data: f(self.data),
            event: self.event,
        }
    }
}
