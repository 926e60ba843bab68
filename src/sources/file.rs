//! Local JSON dump reader, used by the offline CLI.

use super::{PostSource, SourceError};
use crate::models::Post;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Reads a JSON array of posts from the file at `link`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileSource;

#[async_trait]
impl PostSource for JsonFileSource {
    async fn fetch_posts(
        &self,
        link: &str,
        from: OffsetDateTime,
        to: Option<OffsetDateTime>,
    ) -> Result<Vec<Post>, SourceError> {
        let raw = tokio::fs::read_to_string(link)
            .await
            .map_err(|error| SourceError::Fetch {
                link: link.to_string(),
                reason: error.to_string(),
            })?;
        let posts: Vec<Post> = serde_json::from_str(&raw).map_err(|error| SourceError::Parse {
            link: link.to_string(),
            reason: error.to_string(),
        })?;
        Ok(posts
            .into_iter()
            .filter(|post| post.published_time >= from)
            .filter(|post| to.is_none_or(|end| post.published_time < end))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use time::macros::datetime;

    fn write_dump(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "news-grouper-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("write dump");
        path
    }

    #[tokio::test]
    async fn keeps_posts_inside_the_window() {
        let dump = json!([
            { "title": "early", "body": "b", "published_time": "2025-01-01T00:00:00Z", "author": "a", "link": "l1" },
            { "title": "start", "body": "b", "published_time": "2025-01-02T00:00:00Z", "author": "a", "link": "l2" },
            { "title": "end", "body": "b", "published_time": "2025-01-03T00:00:00Z", "author": "a", "link": "l3" }
        ]);
        let path = write_dump("window", &dump.to_string());

        let posts = JsonFileSource
            .fetch_posts(
                path.to_str().expect("utf-8 path"),
                datetime!(2025-01-02 00:00 UTC),
                Some(datetime!(2025-01-03 00:00 UTC)),
            )
            .await
            .expect("posts");
        std::fs::remove_file(&path).ok();

        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["start"]);
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let error = JsonFileSource
            .fetch_posts("/nonexistent/news-grouper.json", OffsetDateTime::UNIX_EPOCH, None)
            .await
            .expect_err("missing file");
        assert!(matches!(error, SourceError::Fetch { .. }));
    }

    #[tokio::test]
    async fn malformed_dump_is_a_parse_error() {
        let path = write_dump("malformed", "{ not posts");
        let link = path.to_str().expect("utf-8 path");
        let error = JsonFileSource
            .fetch_posts(link, OffsetDateTime::UNIX_EPOCH, None)
            .await
            .expect_err("bad json");
        std::fs::remove_file(&path).ok();
        assert!(matches!(error, SourceError::Parse { .. }));
    }
}
