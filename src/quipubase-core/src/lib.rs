//! Quipubase Core Library
//!
//! This crate provides the shared types for Quipubase clients, including:
//! - Wire data model (action requests, statuses, collections, events)
//! - JSON schema inference from sample values
//! - Client configuration

pub mod config;
pub mod models;
pub mod schema;

// Re-export commonly used types
pub use config::{ClientConfig, TransportMode, DEFAULT_BASE_URL};
pub use models::*;
pub use schema::{infer_schema, output_schema};
