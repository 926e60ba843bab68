use crate::models::Post;
use crate::provider::ProviderError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Dense vector describing the semantic content of one post.
pub type Embedding = Vec<f32>;

/// Intent hint forwarded to the embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// Vectors are compared against each other for semantic closeness.
    SemanticSimilarity,
}

impl TaskType {
    /// Wire name understood by the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SemanticSimilarity => "SEMANTIC_SIMILARITY",
        }
    }
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text. `Ok(None)` means the provider answered without a usable vector.
    async fn embed(&self, text: &str, task_type: TaskType)
    -> Result<Option<Embedding>, ProviderError>;
}

/// Reasons a post could not be embedded.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Provider succeeded but returned no vector values.
    #[error("Provider returned an empty embedding")]
    Empty,
}

impl EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(error) => error.is_transient(),
            Self::Empty => true,
        }
    }
}

/// Retrying wrapper that turns provider flakiness into a per-post failure value.
#[derive(Clone)]
pub struct EmbeddingService {
    client: Arc<dyn EmbeddingClient>,
    retry: RetryPolicy,
}

impl EmbeddingService {
    /// Wrap `client` with the supplied retry policy.
    pub fn new(client: Arc<dyn EmbeddingClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Embed the body of `post`.
    ///
    /// Transient failures and empty vectors are retried according to the policy. The final
    /// error is returned as a value so the caller can isolate the post instead of failing
    /// the whole request.
    pub async fn compute_embedding(&self, post: &Post) -> Result<Embedding, EmbeddingError> {
        let result = self
            .retry
            .run(
                "embed_content",
                |attempt| async move {
                    tracing::debug!(attempt, title = %post.title, "Requesting embedding");
                    match self
                        .client
                        .embed(&post.body, TaskType::SemanticSimilarity)
                        .await
                    {
                        Ok(Some(vector)) if !vector.is_empty() => Ok(vector),
                        Ok(_) => Err(EmbeddingError::Empty),
                        Err(error) => Err(EmbeddingError::Provider(error)),
                    }
                },
                EmbeddingError::is_retryable,
            )
            .await;

        if let Err(error) = &result {
            tracing::error!(title = %post.title, error = %error, "Failed to compute embedding for post");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use std::time::Duration;
    use time::OffsetDateTime;

    /// Replays scripted responses, then repeats the last one.
    struct ScriptedClient {
        responses: Mutex<Vec<Result<Option<Embedding>, ProviderError>>>,
        calls: Mutex<Vec<(String, TaskType)>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<Option<Embedding>, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EmbeddingClient for ScriptedClient {
        async fn embed(
            &self,
            text: &str,
            task_type: TaskType,
        ) -> Result<Option<Embedding>, ProviderError> {
            self.calls.lock().unwrap().push((text.to_string(), task_type));
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                match &responses[0] {
                    Ok(value) => Ok(value.clone()),
                    Err(_) => Err(ProviderError::Transport("still down".into())),
                }
            }
        }
    }

    fn post() -> Post {
        Post {
            title: "Rates".into(),
            body: "Central bank holds rates".into(),
            published_time: OffsetDateTime::UNIX_EPOCH,
            author: "Desk".into(),
            link: "https://news.example/rates".into(),
        }
    }

    fn service(client: Arc<ScriptedClient>) -> EmbeddingService {
        EmbeddingService::new(client, RetryPolicy::fixed(5, Duration::ZERO))
    }

    #[tokio::test]
    async fn sends_body_with_semantic_similarity_task() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(Some(vec![0.1, 0.2]))]));
        let vector = service(client.clone())
            .compute_embedding(&post())
            .await
            .expect("embedding");

        assert_eq!(vector, vec![0.1, 0.2]);
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].0, "Central bank holds rates");
        assert_eq!(calls[0].1, TaskType::SemanticSimilarity);
    }

    #[tokio::test]
    async fn retries_empty_and_transient_responses() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(ProviderError::Transport("reset".into())),
            Ok(None),
            Ok(Some(Vec::new())),
            Ok(Some(vec![1.0])),
        ]));
        let vector = service(client.clone())
            .compute_embedding(&post())
            .await
            .expect("embedding after retries");

        assert_eq!(vector, vec![1.0]);
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test]
    async fn gives_up_after_five_attempts() {
        let client = Arc::new(ScriptedClient::new(vec![Err(ProviderError::Transport(
            "down".into(),
        ))]));
        let error = service(client.clone())
            .compute_embedding(&post())
            .await
            .expect_err("exhausted");

        assert!(matches!(error, EmbeddingError::Provider(_)));
        assert_eq!(client.call_count(), 5);
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_retried() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(ProviderError::Status {
                status: StatusCode::FORBIDDEN,
                body: "API key not valid".into(),
            }),
            Ok(Some(vec![1.0])),
        ]));
        let result = service(client.clone()).compute_embedding(&post()).await;

        assert!(result.is_err());
        assert_eq!(client.call_count(), 1);
    }
}
