use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::clustering::ClusteringSettings;
use crate::retry::RetryPolicy;

/// Default REST endpoint for the Google Generative Language API.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash-lite";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the News Grouper server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key passed to the Generative Language API.
    pub google_api_key: String,
    /// Base URL of the Generative Language REST API.
    pub gemini_base_url: String,
    /// Model used to embed post bodies.
    pub embedding_model: String,
    /// Model used to write group summaries.
    pub generation_model: String,
    /// Attempts allowed per provider call, including the first one.
    pub provider_max_attempts: u32,
    /// Fixed wait between provider attempts, in milliseconds.
    pub provider_retry_delay_ms: u64,
    /// Upper bound on a single provider HTTP request, in milliseconds.
    pub provider_timeout_ms: u64,
    /// Maximum number of embedding requests in flight per grouping request.
    pub embedding_concurrency: usize,
    /// Maximum number of summary requests in flight per grouping request.
    pub summarization_concurrency: usize,
    /// Complete-linkage distance at or above which clusters are not merged.
    pub agglomerative_distance_threshold: f32,
    /// Neighbourhood radius used by the DBSCAN grouper.
    pub dbscan_eps: f32,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            google_api_key: load_env("GOOGLE_API_KEY")?,
            gemini_base_url: load_env_optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            provider_max_attempts: load_env_parsed("PROVIDER_MAX_ATTEMPTS")?.unwrap_or(5),
            provider_retry_delay_ms: load_env_parsed("PROVIDER_RETRY_DELAY_MS")?.unwrap_or(2000),
            provider_timeout_ms: load_env_parsed("PROVIDER_TIMEOUT_MS")?.unwrap_or(30_000),
            embedding_concurrency: load_env_parsed("EMBEDDING_CONCURRENCY")?.unwrap_or(8),
            summarization_concurrency: load_env_parsed("SUMMARIZATION_CONCURRENCY")?
                .unwrap_or(4),
            agglomerative_distance_threshold: load_env_parsed(
                "AGGLOMERATIVE_DISTANCE_THRESHOLD",
            )?
            .unwrap_or(0.17),
            dbscan_eps: load_env_parsed("DBSCAN_EPS")?.unwrap_or(0.17),
            server_port: load_env_parsed("SERVER_PORT")?,
        };

        if config.provider_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("PROVIDER_MAX_ATTEMPTS".into()));
        }
        if config.provider_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("PROVIDER_TIMEOUT_MS".into()));
        }
        if config.embedding_concurrency == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_CONCURRENCY".into()));
        }
        if config.summarization_concurrency == 0 {
            return Err(ConfigError::InvalidValue("SUMMARIZATION_CONCURRENCY".into()));
        }

        Ok(config)
    }

    /// Retry policy shared by the embedding and summarization services.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.provider_max_attempts,
            Duration::from_millis(self.provider_retry_delay_ms),
        )
    }

    /// Per-request timeout applied to the Gemini HTTP client.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Thresholds used when registering the built-in groupers.
    pub fn clustering_settings(&self) -> ClusteringSettings {
        ClusteringSettings {
            agglomerative_distance_threshold: self.agglomerative_distance_threshold,
            dbscan_eps: self.dbscan_eps,
            ..ClusteringSettings::default()
        }
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        base_url = %config.gemini_base_url,
        embedding_model = %config.embedding_model,
        generation_model = %config.generation_model,
        max_attempts = config.provider_max_attempts,
        retry_delay_ms = config.provider_retry_delay_ms,
        timeout_ms = config.provider_timeout_ms,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
