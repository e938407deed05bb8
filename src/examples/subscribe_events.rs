//! Event Subscription Example
//!
//! Subscribes to a collection's event stream, publishes a few events and
//! closes the subscription.
//!
//! Run with: cargo run --example subscribe_events -- <collection-id> [push|pull]

use quipubase_rs::{ActionRequest, Client, ClientConfig, SseEvent, TransportMode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment filter for log levels
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quipubase_rs=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    let mut args = std::env::args().skip(1);
    let collection_id = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: subscribe_events <collection-id> [push|pull]"))?;
    let transport = match args.next().as_deref() {
        Some("pull") => TransportMode::Pull,
        Some("push") => TransportMode::Push,
        _ => TransportMode::Auto,
    };

    let client = Client::from_config(&ClientConfig::default().with_transport(transport))?;
    println!(
        "Subscribing to {} via {} transport",
        collection_id,
        client.transport_name()
    );

    let subscription = client
        .subscribe(&collection_id, |event: SseEvent<Value>| {
            println!("[{}] {}", event.event, event.data);
        })
        .await?;

    for n in 0..3 {
        let status = client
            .publish(&collection_id, &ActionRequest::create(json!({"n": n})))
            .await?;
        println!("Published event {}: {}", n, status.message);
    }

    tokio::time::sleep(Duration::from_secs(2)).await;

    subscription.close();
    subscription.join().await;
    println!("Subscription closed");

    Ok(())
}
