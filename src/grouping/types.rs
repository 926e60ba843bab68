//! Errors surfaced to callers of the grouping pipeline.

use crate::grouping::registry::RegistryError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Client-input errors returned by the grouping operations.
///
/// Provider failures never appear here: failed embeddings become singleton posts and failed
/// summaries carry the fallback text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupingError {
    /// The requested grouper is not registered.
    #[error("Unknown grouper: {0}")]
    UnknownGrouper(String),
    /// The caller supplied an empty post list.
    #[error("No posts supplied for grouping")]
    NoInput,
    /// None of the configured sources returned posts.
    #[error("No posts available from the configured sources")]
    NoPostsAvailable,
}

/// Failures while assembling the production grouping service.
#[derive(Debug, Error)]
pub enum InitError {
    /// The provider HTTP client could not be built.
    #[error("Failed to construct Gemini client: {0}")]
    Provider(#[from] ProviderError),
    /// A built-in grouper was rejected by the registry.
    #[error("Failed to register built-in groupers: {0}")]
    Registry(#[from] RegistryError),
}
