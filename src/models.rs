//! Value types flowing through the grouping pipeline.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single news item fetched from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Headline or first line of the post.
    pub title: String,
    /// Plain-text body used for embeddings and summaries.
    pub body: String,
    /// Publication timestamp, RFC 3339 on the wire.
    #[serde(with = "time::serde::rfc3339")]
    pub published_time: OffsetDateTime,
    /// Author or channel name.
    pub author: String,
    /// Link back to the original post.
    pub link: String,
}

/// Two or more semantically related posts with a generated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostGroup {
    /// Posts belonging to the group, in input order.
    pub posts: Vec<Post>,
    /// Summary text produced by the generation provider, or the fallback text.
    pub summary: String,
}

/// One entry of a grouping result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupedItem {
    /// A post that did not join any group.
    Post(Post),
    /// A summarized group of posts.
    Group(PostGroup),
}

impl GroupedItem {
    /// Posts carried by this entry.
    pub fn posts(&self) -> &[Post] {
        match self {
            Self::Post(post) => std::slice::from_ref(post),
            Self::Group(group) => &group.posts,
        }
    }
}

/// Grouping output split the way callers receive it: summarized groups and standalone posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedPosts {
    /// Multi-post groups with their summaries, in output order.
    pub post_groups: Vec<PostGroup>,
    /// Posts that did not join any group, in output order.
    pub posts: Vec<Post>,
}

impl From<Vec<GroupedItem>> for GroupedPosts {
    fn from(items: Vec<GroupedItem>) -> Self {
        let mut split = Self::default();
        for item in items {
            match item {
                GroupedItem::Group(group) => split.post_groups.push(group),
                GroupedItem::Post(post) => split.posts.push(post),
            }
        }
        split
    }
}
