//! Google Generative Language REST adapter.
//!
//! One [`GeminiClient`] serves both embeddings (`:embedContent`) and summaries
//! (`:generateContent`). The client holds a pooled `reqwest::Client`, so build it once and
//! share it behind an `Arc`. A client can carry any API key, which lets callers build one per
//! user when keys are supplied per account.
//!
//! Every request is bounded by the client timeout. A request that outlives it fails as a
//! transport error and goes back through the retry policy like any other transient failure.

use crate::config::Config;
use crate::embedding::{Embedding, EmbeddingClient, TaskType};
use crate::provider::ProviderError;
use crate::summarization::{GenerationClient, SamplingConfig};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for the Gemini embedding and generation endpoints.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
}

impl GeminiClient {
    /// Construct a client from explicit settings.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        embedding_model: impl Into<String>,
        generation_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent("news-grouper/0.1")
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let embedding_model = embedding_model.into();
        let generation_model = generation_model.into();
        tracing::debug!(
            url = %base_url,
            embedding_model = %embedding_model,
            generation_model = %generation_model,
            timeout_ms = timeout.as_millis() as u64,
            "Initialized Gemini HTTP client"
        );
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            embedding_model,
            generation_model,
        })
    }

    /// Construct a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Self::new(
            &config.gemini_base_url,
            &config.google_api_key,
            &config.embedding_model,
            &config.generation_model,
            config.provider_timeout(),
        )
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: String,
        payload: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ProviderError::Transport(format!("failed to reach Gemini at {url}: {error}"))
            })?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status { status, body });
    }
    // Reading the body can still hit the client timeout; only a bad payload is permanent.
    let bytes = response
        .bytes()
        .await
        .map_err(|error| ProviderError::Transport(format!("failed to read Gemini body: {error}")))?;
    serde_json::from_slice(&bytes).map_err(|error| {
        ProviderError::InvalidResponse(format!("failed to decode Gemini response: {error}"))
    })
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    #[serde(default)]
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
impl EmbeddingClient for GeminiClient {
    async fn embed(
        &self,
        text: &str,
        task_type: TaskType,
    ) -> Result<Option<Embedding>, ProviderError> {
        let payload = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type.as_str(),
        });
        let body: EmbedContentResponse = self
            .post(self.endpoint(&self.embedding_model, "embedContent"), payload)
            .await?;
        Ok(body
            .embedding
            .map(|embedding| embedding.values)
            .filter(|values| !values.is_empty()))
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<Option<String>, ProviderError> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": sampling.temperature,
                "topP": sampling.top_p,
                "thinkingConfig": { "thinkingBudget": sampling.thinking_budget },
            },
        });
        let body: GenerateContentResponse = self
            .post(self.endpoint(&self.generation_model, "generateContent"), payload)
            .await?;
        Ok(body.text())
    }
}
