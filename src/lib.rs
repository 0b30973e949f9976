//! # triage-rs
//!
//! Email triage assistant core: classifies batches of messages with an AI
//! model while streaming progress, and finds and merges duplicate tasks
//! with an AI grouping call.
//!
//! Storage is Postgres (sqlx), models are reached through rig-core, and the
//! HTTP/SSE surface is axum. Observability goes through tracing and
//! OpenTelemetry.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod llm;
pub mod model;
pub mod progress;
pub mod server;
pub mod store;
pub mod taxonomy;
pub mod telemetry;
