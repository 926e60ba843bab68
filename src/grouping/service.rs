//! Caller-facing grouping service shared by the HTTP surface and the CLI.

use crate::{
    config::Config,
    embedding::EmbeddingService,
    gemini::GeminiClient,
    grouping::{
        grouper::NewsGrouper,
        registry::{Grouper, GrouperDescriptor, GrouperRegistry, RegistryError},
        types::{GroupingError, InitError},
    },
    metrics::{GroupingMetrics, MetricsSnapshot},
    models::{GroupedItem, Post},
    sources::{ConfiguredSource, collect_posts},
    summarization::SummarizationService,
};
use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;

/// Validates requests, resolves the grouper, and runs the orchestrator.
///
/// Construct the service once near process start and share it through an `Arc`. The
/// registry is immutable after construction, so concurrent requests read it without locks.
pub struct GroupingService {
    registry: Arc<GrouperRegistry>,
    grouper: NewsGrouper,
    metrics: Arc<GroupingMetrics>,
}

/// Abstraction over the grouping pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait GroupingApi: Send + Sync {
    /// Group `posts` with the grouper registered under `grouper_name`.
    async fn group_posts(
        &self,
        posts: Vec<Post>,
        grouper_name: &str,
    ) -> Result<Vec<GroupedItem>, GroupingError>;

    /// Collect posts from `sources` published in `[from, to)` and group them.
    async fn group_sources(
        &self,
        sources: &[ConfiguredSource],
        from: OffsetDateTime,
        to: Option<OffsetDateTime>,
        grouper_name: &str,
    ) -> Result<Vec<GroupedItem>, GroupingError>;

    /// Describe every registered grouper.
    fn list_groupers(&self) -> Vec<GrouperDescriptor>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl GroupingService {
    /// Assemble a service from an explicit registry and orchestrator.
    pub fn new(registry: Arc<GrouperRegistry>, grouper: NewsGrouper) -> Self {
        let metrics = grouper.metrics();
        Self {
            registry,
            grouper,
            metrics,
        }
    }

    /// Build the production service: Gemini-backed providers and the default groupers.
    pub fn from_config(config: &Config) -> Result<Self, InitError> {
        tracing::info!("Initializing Gemini client");
        let client = Arc::new(GeminiClient::from_config(config)?);
        let retry = config.retry_policy();
        let grouper = NewsGrouper::new(
            EmbeddingService::new(client.clone(), retry),
            SummarizationService::new(client, retry),
        )
        .with_concurrency(
            config.embedding_concurrency,
            config.summarization_concurrency,
        );
        let registry = GrouperRegistry::with_defaults(&config.clustering_settings())?;
        tracing::info!(groupers = registry.list().len(), "Grouper registry ready");
        Ok(Self::new(Arc::new(registry), grouper))
    }

    /// Group posts with the named grouper.
    ///
    /// Fails only for client-input problems, before any provider call is made.
    pub async fn group_posts(
        &self,
        posts: Vec<Post>,
        grouper_name: &str,
    ) -> Result<Vec<GroupedItem>, GroupingError> {
        if posts.is_empty() {
            return Err(GroupingError::NoInput);
        }
        let grouper = self.resolve(grouper_name)?;
        self.metrics.record_request(posts.len() as u64);
        tracing::info!(grouper = grouper_name, posts = posts.len(), "Grouping posts");
        Ok(self.grouper.group_posts(posts, grouper.strategy()).await)
    }

    /// Fetch posts from every source in the window, then group them.
    pub async fn group_sources(
        &self,
        sources: &[ConfiguredSource],
        from: OffsetDateTime,
        to: Option<OffsetDateTime>,
        grouper_name: &str,
    ) -> Result<Vec<GroupedItem>, GroupingError> {
        self.resolve(grouper_name)?;
        let posts = collect_posts(sources, from, to).await;
        if posts.is_empty() {
            return Err(GroupingError::NoPostsAvailable);
        }
        self.group_posts(posts, grouper_name).await
    }

    /// Describe every registered grouper.
    pub fn list_groupers(&self) -> Vec<GrouperDescriptor> {
        self.registry.list()
    }

    /// Return the current grouping metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn resolve(&self, grouper_name: &str) -> Result<&Grouper, GroupingError> {
        self.registry.resolve(grouper_name).map_err(|error| match error {
            RegistryError::NotFound(name) => GroupingError::UnknownGrouper(name),
            other => GroupingError::UnknownGrouper(other.to_string()),
        })
    }
}

#[async_trait]
impl GroupingApi for GroupingService {
    async fn group_posts(
        &self,
        posts: Vec<Post>,
        grouper_name: &str,
    ) -> Result<Vec<GroupedItem>, GroupingError> {
        GroupingService::group_posts(self, posts, grouper_name).await
    }

    async fn group_sources(
        &self,
        sources: &[ConfiguredSource],
        from: OffsetDateTime,
        to: Option<OffsetDateTime>,
        grouper_name: &str,
    ) -> Result<Vec<GroupedItem>, GroupingError> {
        GroupingService::group_sources(self, sources, from, to, grouper_name).await
    }

    fn list_groupers(&self) -> Vec<GrouperDescriptor> {
        GroupingService::list_groupers(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        GroupingService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clustering::ClusteringSettings,
        embedding::{Embedding, EmbeddingClient, TaskType},
        provider::ProviderError,
        retry::RetryPolicy,
        sources::{PostSource, SourceError},
        summarization::{GenerationClient, SamplingConfig},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingClient for CountingEmbedder {
        async fn embed(
            &self,
            text: &str,
            _task_type: TaskType,
        ) -> Result<Option<Embedding>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("Company X") {
                Ok(Some(vec![1.0, 0.0]))
            } else {
                Ok(Some(vec![0.0, 1.0]))
            }
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl GenerationClient for EchoGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _sampling: &SamplingConfig,
        ) -> Result<Option<String>, ProviderError> {
            Ok(Some("Company X raised funding [1, 2].".into()))
        }
    }

    struct EmptySource;

    #[async_trait]
    impl PostSource for EmptySource {
        async fn fetch_posts(
            &self,
            _link: &str,
            _from: OffsetDateTime,
            _to: Option<OffsetDateTime>,
        ) -> Result<Vec<Post>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn post(body: &str) -> Post {
        Post {
            title: body.into(),
            body: body.into(),
            published_time: OffsetDateTime::UNIX_EPOCH,
            author: "wire".into(),
            link: "https://news.example".into(),
        }
    }

    fn service(embedder: Arc<CountingEmbedder>) -> GroupingService {
        let retry = RetryPolicy::fixed(5, Duration::ZERO);
        let grouper = NewsGrouper::new(
            EmbeddingService::new(embedder, retry),
            SummarizationService::new(Arc::new(EchoGenerator), retry),
        );
        let registry =
            GrouperRegistry::with_defaults(&ClusteringSettings::default()).expect("registry");
        GroupingService::new(Arc::new(registry), grouper)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn grouping_futures_are_send() {
        let service = service(Arc::new(CountingEmbedder::default()));
        let grouping =
            service.group_posts(vec![post("Weather")], crate::grouping::DBSCAN_GROUPER);
        assert_send(&grouping);

        let sources: Vec<ConfiguredSource> = Vec::new();
        let collecting = service.group_sources(
            &sources,
            OffsetDateTime::UNIX_EPOCH,
            None,
            crate::grouping::DBSCAN_GROUPER,
        );
        assert_send(&collecting);

        let api: &dyn GroupingApi = &service;
        let collecting = api.group_sources(
            &sources,
            OffsetDateTime::UNIX_EPOCH,
            None,
            crate::grouping::DBSCAN_GROUPER,
        );
        assert_send(&collecting);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let embedder = Arc::new(CountingEmbedder::default());
        let result = service(embedder.clone())
            .group_posts(Vec::new(), crate::grouping::AGGLOMERATIVE_GROUPER)
            .await;

        assert_eq!(result, Err(GroupingError::NoInput));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_grouper_fails_before_any_provider_call() {
        let embedder = Arc::new(CountingEmbedder::default());
        let service = service(embedder.clone());
        let result = service.group_posts(vec![post("Weather")], "Nope").await;

        assert_eq!(result, Err(GroupingError::UnknownGrouper("Nope".into())));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.metrics_snapshot().requests, 0);
    }

    #[tokio::test]
    async fn groups_and_counts_a_request() {
        let embedder = Arc::new(CountingEmbedder::default());
        let service = service(embedder.clone());
        let items = service
            .group_posts(
                vec![
                    post("Company X raises $10M"),
                    post("Company X closes $10M round"),
                    post("Weather is sunny"),
                ],
                crate::grouping::DBSCAN_GROUPER,
            )
            .await
            .expect("grouped");

        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], GroupedItem::Group(group) if group.posts.len() == 2));
        assert!(matches!(&items[1], GroupedItem::Post(p) if p.body == "Weather is sunny"));
        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.requests, 1);
        assert_eq!(snapshot.posts_received, 3);
        assert_eq!(snapshot.groups_summarized, 1);
    }

    #[tokio::test]
    async fn sources_without_posts_are_reported() {
        let service = service(Arc::new(CountingEmbedder::default()));
        let sources = vec![ConfiguredSource {
            link: "https://feed.example/rss".into(),
            source: Arc::new(EmptySource),
        }];
        let result = service
            .group_sources(
                &sources,
                OffsetDateTime::UNIX_EPOCH,
                None,
                crate::grouping::AGGLOMERATIVE_GROUPER,
            )
            .await;

        assert_eq!(result, Err(GroupingError::NoPostsAvailable));
    }
}
