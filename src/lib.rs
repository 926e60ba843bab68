#![deny(missing_docs)]

//! Core library for the News Grouper service.

/// HTTP routing and REST handlers.
pub mod api;
/// Distance matrices and clustering strategies.
pub mod clustering;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and the retrying embedding service.
pub mod embedding;
/// Google Generative Language REST adapter.
pub mod gemini;
/// Grouper registry, orchestrator, and caller-facing service.
pub mod grouping;
/// Structured logging and tracing setup.
pub mod logging;
/// Grouping metrics helpers.
pub mod metrics;
/// Post and post group value types.
pub mod models;
/// Error classification shared by provider clients.
pub mod provider;
/// Explicit retry policy for provider calls.
pub mod retry;
/// News source collaborator interface.
pub mod sources;
/// Text generation client abstraction and the summarization service.
pub mod summarization;
