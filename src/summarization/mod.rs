//! Abstractive summaries for groups of related posts.
//!
//! The service assembles a citation-friendly prompt, calls the configured generation
//! provider through the shared retry policy, and falls back to a fixed string when every
//! attempt fails. A failed summary never fails the grouping request.

use crate::models::Post;
use crate::provider::ProviderError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Summary returned when the provider never produced usable text.
pub const FALLBACK_SUMMARY: &str = "Failed to generate summary.";

const SUMMARY_INSTRUCTIONS: &str = "You are given group of posts with similar semantic meaning. \
Your goal is to write condensed summary of posts which takes into account all information given \
but is not to broad. After each sentence you can add list of post ids from where you took that \
information. Also add title at the beginning of text which tells everything in 1-2 sentences. \
Don't use Markdown. Format of list: [id, id, id]. When processing posts, please ignore any \
information that appears to be author metadata or technical details (e.g., author names, \
subscription requests), especially if they are at the beginning or end of the text and separated \
by a newline (\\n). If this metadata looks like text to which post replied, then use it.";

const INPUT_FORMAT: &str = "Input format: {id: {'author':text, 'body': text}, {'author':text, 'body': text}}";

/// Sampling parameters forwarded to the generation provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    /// Softmax temperature.
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Reasoning token budget; zero disables thinking.
    pub thinking_budget: u32,
}

impl SamplingConfig {
    /// Low-variance sampling without reasoning, tuned for latency.
    pub const SUMMARY: Self = Self {
        temperature: 0.5,
        top_p: 0.5,
        thinking_budget: 0,
    };
}

/// Interface implemented by text generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for `prompt`. `Ok(None)` means the provider answered without text.
    async fn generate(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<Option<String>, ProviderError>;
}

#[derive(Debug, Error)]
enum SummaryError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Provider returned an empty summary")]
    Empty,
}

impl SummaryError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(error) => error.is_transient(),
            Self::Empty => true,
        }
    }
}

#[derive(Serialize)]
struct PromptPost<'a> {
    author: &'a str,
    body: &'a str,
}

/// Build the summarization prompt, numbering posts from 1 so citations map back to them.
pub fn build_summary_prompt(posts: &[Post]) -> String {
    let input: BTreeMap<usize, PromptPost<'_>> = posts
        .iter()
        .enumerate()
        .map(|(index, post)| {
            (
                index + 1,
                PromptPost {
                    author: &post.author,
                    body: &post.body,
                },
            )
        })
        .collect();
    // Map keys are plain integers and values plain strings; serialization cannot fail.
    let input = serde_json::to_string(&input).unwrap_or_default();
    format!("{SUMMARY_INSTRUCTIONS}\n{INPUT_FORMAT}\nInput:\n{input}")
}

/// Retrying wrapper around a generation client that always yields a summary string.
#[derive(Clone)]
pub struct SummarizationService {
    client: Arc<dyn GenerationClient>,
    retry: RetryPolicy,
}

/// Summary text together with whether the fallback had to be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Text attached to the post group.
    pub text: String,
    /// True when every attempt failed and [`FALLBACK_SUMMARY`] was substituted.
    pub fallback: bool,
}

impl SummarizationService {
    /// Wrap `client` with the supplied retry policy.
    pub fn new(client: Arc<dyn GenerationClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Summarize a group of posts, returning [`FALLBACK_SUMMARY`] when generation fails.
    pub async fn summarize(&self, posts: &[Post]) -> String {
        self.summarize_with_outcome(posts).await.text
    }

    /// Summarize a group of posts and report whether the fallback text was used.
    pub async fn summarize_with_outcome(&self, posts: &[Post]) -> SummaryOutcome {
        let prompt = build_summary_prompt(posts);
        let prompt = prompt.as_str();
        let result = self
            .retry
            .run(
                "generate_content",
                |attempt| async move {
                    tracing::debug!(attempt, posts = posts.len(), "Requesting summary");
                    match self.client.generate(prompt, &SamplingConfig::SUMMARY).await {
                        Ok(Some(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
                        Ok(_) => Err(SummaryError::Empty),
                        Err(error) => Err(SummaryError::Provider(error)),
                    }
                },
                SummaryError::is_retryable,
            )
            .await;

        match result {
            Ok(text) => SummaryOutcome {
                text,
                fallback: false,
            },
            Err(error) => {
                tracing::error!(
                    posts = posts.len(),
                    error = %error,
                    "Failed to summarize post group; using fallback summary"
                );
                SummaryOutcome {
                    text: FALLBACK_SUMMARY.to_string(),
                    fallback: true,
                }
            }
        }
    }
}
