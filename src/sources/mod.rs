//! News source collaborator interface.
//!
//! Feed parsing (RSS, Telegram bridges) lives outside this crate. A source only needs to
//! return the posts published inside a time window. [`JsonFileSource`] reads local dumps.

mod file;

pub use file::JsonFileSource;

use crate::models::Post;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors surfaced by a source while fetching posts.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The feed could not be downloaded.
    #[error("Failed to fetch {link}: {reason}")]
    Fetch {
        /// Feed link that failed.
        link: String,
        /// Provider-specific failure description.
        reason: String,
    },
    /// The feed was downloaded but could not be parsed into posts.
    #[error("Failed to parse {link}: {reason}")]
    Parse {
        /// Feed link that failed.
        link: String,
        /// Provider-specific failure description.
        reason: String,
    },
}

/// Fetches posts from one kind of news feed.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Posts from `link` published at or after `from` and, when given, before `to`.
    async fn fetch_posts(
        &self,
        link: &str,
        from: OffsetDateTime,
        to: Option<OffsetDateTime>,
    ) -> Result<Vec<Post>, SourceError>;
}

/// A feed link paired with the source able to read it.
#[derive(Clone)]
pub struct ConfiguredSource {
    /// Feed link passed to the source.
    pub link: String,
    /// Parser used for this link.
    pub source: Arc<dyn PostSource>,
}

/// Fetch every configured source in order and concatenate the results.
///
/// A failing source is logged and skipped so one broken feed does not hide the others.
pub async fn collect_posts(
    sources: &[ConfiguredSource],
    from: OffsetDateTime,
    to: Option<OffsetDateTime>,
) -> Vec<Post> {
    let mut posts = Vec::new();
    for configured in sources {
        match configured.source.fetch_posts(&configured.link, from, to).await {
            Ok(fetched) => {
                tracing::debug!(link = %configured.link, posts = fetched.len(), "Fetched posts");
                posts.extend(fetched);
            }
            Err(error) => {
                tracing::warn!(link = %configured.link, error = %error, "Skipping news source");
            }
        }
    }
    posts
}
