//! Basic Client Example
//!
//! Creates a collection from a sample document, walks a document through
//! create/read/update/query/delete and removes the collection again.
//!
//! Run with: cargo run --example basic_client
//! Optionally pass a config file: cargo run --example basic_client -- quipubase.json

use quipubase_rs::{Client, ClientConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    title: String,
    done: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment filter for log levels
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quipubase_rs=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(&path)?,
        None => ClientConfig::default(),
    };
    let client = Client::from_config(&config)?;
    println!("Connected to {}\n", client.base_url());

    // Schema is inferred from a sample document
    let name = format!("tasks-{}", uuid::Uuid::new_v4());
    let collection = client
        .create_collection_from_sample(&name, &json!({"title": "sample", "done": false}))
        .await?;
    println!("Created collection {} ({})", collection.name, collection.id);

    let task = client
        .create(
            &collection.id,
            &Task {
                id: None,
                title: "Write the report".to_string(),
                done: false,
            },
        )
        .await?;
    println!("Created task: {:?}", task);

    if let Some(id) = task.id.as_deref() {
        let mut fetched: Task = client.read(&collection.id, id).await?;
        fetched.done = true;
        let updated = client.update(&collection.id, id, &fetched).await?;
        println!("Updated task: {:?}", updated);

        let schema = client.describe_document(&collection.id, id).await?;
        println!("Document schema: {}", serde_json::to_string_pretty(&schema)?);
    }

    let finished: Vec<Task> = client.query(&collection.id, &json!({"done": true})).await?;
    println!("Finished tasks: {}", finished.len());

    for task in &finished {
        if let Some(id) = task.id.as_deref() {
            let status = client.delete(&collection.id, id).await?;
            println!("Deleted {}: {}", id, status.message);
        }
    }

    let flags = client.delete_collection(&collection.id).await?;
    println!("Collection removed: {:?}", flags);

    Ok(())
}
