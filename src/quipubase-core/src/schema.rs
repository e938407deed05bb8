//! Shape inference over parsed JSON values.
//!
//! Inference only describes a value; it never checks a value against a schema.

use serde_json::{Map, Value};

use crate::models::JsonSchema;

/// Infer a [`JsonSchema`] from a concrete JSON value.
///
/// Arrays sample only their first element. Objects are titled after their first
/// key and list every non-null key as required. `null` yields the empty schema.
pub fn infer_schema(value: &Value) -> JsonSchema {
    match value {
        Value::Array(items) => JsonSchema {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(infer_element(items.first()))),
            ..JsonSchema::default()
        },
        Value::Object(map) => infer_object(map),
        Value::Null => JsonSchema::default(),
        Value::Bool(_) => JsonSchema::of_type("boolean"),
        Value::Number(_) => JsonSchema::of_type("number"),
        Value::String(_) => JsonSchema::of_type("string"),
    }
}

/// Schema advertised for a method result, titled `{label}:{collection_id}`.
pub fn output_schema(label: &str, collection_id: &str, value: &Value) -> JsonSchema {
    let title = format!("{}:{}", label, collection_id);

    match value {
        Value::Object(map) => {
            let mut schema = JsonSchema::of_type("object");
            schema.title = Some(title);
            for (key, field) in map {
                schema.properties.insert(key.clone(), infer_schema(field));
                if !field.is_null() {
                    schema.required.push(key.clone());
                }
            }
            schema
        }
        other => JsonSchema {
            title: Some(title),
            ..infer_schema(other)
        },
    }
}

// An empty array has no element to sample
fn infer_element(first: Option<&Value>) -> JsonSchema {
    match first {
        Some(value) => infer_schema(value),
        None => JsonSchema::of_type("undefined"),
    }
}

fn infer_object(map: &Map<String, Value>) -> JsonSchema {
    let mut schema = JsonSchema::of_type("object");
    schema.title = map.keys().next().cloned();

    for (key, value) in map {
        schema.properties.insert(key.clone(), infer_schema(value));
        if !value.is_null() {
            schema.required.push(key.clone());
        }
    }

    schema
}
