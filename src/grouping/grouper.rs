//! Orchestrator turning a post list into summarized groups.

use crate::{
    clustering::{ClusterLabel, ClusteringStrategy, DistanceMatrix},
    embedding::{Embedding, EmbeddingService},
    metrics::GroupingMetrics,
    models::{GroupedItem, Post, PostGroup},
    summarization::SummarizationService,
};
use futures_util::{StreamExt, stream};
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_EMBEDDING_CONCURRENCY: usize = 8;
const DEFAULT_SUMMARIZATION_CONCURRENCY: usize = 4;

/// Runs one grouping invocation: embed, cluster, group, summarize.
///
/// The clustering step is supplied per call, so the same orchestrator serves every registered
/// grouper. Provider calls fan out on the caller's task with bounded concurrency; dropping the
/// returned future cancels every in-flight request and pending retry. Clustering itself is
/// CPU-bound and runs on the blocking pool.
#[derive(Clone)]
pub struct NewsGrouper {
    embeddings: EmbeddingService,
    summaries: SummarizationService,
    embedding_concurrency: usize,
    summarization_concurrency: usize,
    metrics: Arc<GroupingMetrics>,
}

/// Posts split by whether a usable embedding was produced, input order preserved.
struct EmbeddedPosts {
    posts: Vec<Post>,
    vectors: Vec<Embedding>,
    unembeddable: Vec<Post>,
}

impl NewsGrouper {
    /// Build an orchestrator around the embedding and summarization services.
    pub fn new(embeddings: EmbeddingService, summaries: SummarizationService) -> Self {
        Self {
            embeddings,
            summaries,
            embedding_concurrency: DEFAULT_EMBEDDING_CONCURRENCY,
            summarization_concurrency: DEFAULT_SUMMARIZATION_CONCURRENCY,
            metrics: Arc::new(GroupingMetrics::new()),
        }
    }

    /// Override the number of concurrent embedding and summary requests (minimum one each).
    pub fn with_concurrency(mut self, embedding: usize, summarization: usize) -> Self {
        self.embedding_concurrency = embedding.max(1);
        self.summarization_concurrency = summarization.max(1);
        self
    }

    /// Record counters into a shared metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<GroupingMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics registry this orchestrator writes to.
    pub fn metrics(&self) -> Arc<GroupingMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Group `posts` using `strategy`.
    ///
    /// Groups come out in first-occurrence order of their earliest post, followed by posts
    /// that could not be embedded (as singletons, in input order). Single-post groups are
    /// returned as bare posts and never summarized.
    pub async fn group_posts(
        &self,
        posts: Vec<Post>,
        strategy: Arc<dyn ClusteringStrategy>,
    ) -> Vec<GroupedItem> {
        let total = posts.len();
        let EmbeddedPosts {
            posts: embedded,
            vectors,
            unembeddable,
        } = self.embed_posts(posts).await;
        tracing::info!(
            stage = "embedding",
            posts = total,
            embedded = embedded.len(),
            unembeddable = unembeddable.len(),
            "Embedding finished"
        );
        if !unembeddable.is_empty() {
            self.metrics
                .record_embedding_failures(unembeddable.len() as u64);
        }

        let labels = if vectors.is_empty() {
            Vec::new()
        } else {
            cluster_off_runtime(strategy, vectors).await
        };
        let mut groups = group_by_label(embedded, labels);
        tracing::info!(stage = "clustering", groups = groups.len(), "Clustering finished");
        groups.extend(unembeddable.into_iter().map(|post| vec![post]));

        let pending: Vec<_> = groups
            .into_iter()
            .map(|posts| self.finish_group(posts))
            .collect();
        let items: Vec<GroupedItem> = stream::iter(pending)
            .buffered(self.summarization_concurrency)
            .collect()
            .await;
        tracing::info!(stage = "done", items = items.len(), "Grouping finished");
        items
    }

    async fn embed_posts(&self, posts: Vec<Post>) -> EmbeddedPosts {
        let pending: Vec<_> = posts
            .iter()
            .map(|post| self.embeddings.compute_embedding(post))
            .collect();
        let results: Vec<_> = stream::iter(pending)
            .buffered(self.embedding_concurrency)
            .collect()
            .await;

        let mut split = EmbeddedPosts {
            posts: Vec::with_capacity(posts.len()),
            vectors: Vec::with_capacity(posts.len()),
            unembeddable: Vec::new(),
        };
        for (post, result) in posts.into_iter().zip(results) {
            match result {
                Ok(vector) => {
                    let expected = split.vectors.first().map(Vec::len);
                    if expected.is_some_and(|dimension| dimension != vector.len()) {
                        tracing::warn!(
                            title = %post.title,
                            expected = ?expected,
                            actual = vector.len(),
                            "Embedding dimension mismatch; passing post through ungrouped"
                        );
                        split.unembeddable.push(post);
                    } else {
                        split.posts.push(post);
                        split.vectors.push(vector);
                    }
                }
                Err(_) => split.unembeddable.push(post),
            }
        }
        split
    }

    async fn finish_group(&self, posts: Vec<Post>) -> GroupedItem {
        match <[Post; 1]>::try_from(posts) {
            Ok([post]) => GroupedItem::Post(post),
            Err(posts) => {
                let outcome = self.summaries.summarize_with_outcome(&posts).await;
                self.metrics.record_summary(outcome.fallback);
                GroupedItem::Group(PostGroup {
                    posts,
                    summary: outcome.text,
                })
            }
        }
    }
}

/// Build the distance matrix and cluster it on the blocking pool.
///
/// A panicking strategy yields no labels, which leaves every post ungrouped.
async fn cluster_off_runtime(
    strategy: Arc<dyn ClusteringStrategy>,
    vectors: Vec<Embedding>,
) -> Vec<ClusterLabel> {
    let rows = vectors.len();
    let task = tokio::task::spawn_blocking(move || {
        strategy.cluster(&DistanceMatrix::from_embeddings(&vectors))
    });
    match task.await {
        Ok(labels) => labels,
        Err(error) => {
            tracing::error!(rows, error = %error, "Clustering task failed");
            Vec::new()
        }
    }
}

/// Collect posts sharing a label, ordering groups by their first post.
fn group_by_label(posts: Vec<Post>, labels: Vec<ClusterLabel>) -> Vec<Vec<Post>> {
    if labels.len() != posts.len() {
        tracing::error!(
            posts = posts.len(),
            labels = labels.len(),
            "Clustering returned the wrong number of labels; leaving posts ungrouped"
        );
        return posts.into_iter().map(|post| vec![post]).collect();
    }

    let mut slots: HashMap<ClusterLabel, usize> = HashMap::new();
    let mut groups: Vec<Vec<Post>> = Vec::new();
    for (post, label) in posts.into_iter().zip(labels) {
        let slot = *slots.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(post);
    }
    groups
}
