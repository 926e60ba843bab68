//! Error classification shared by the embedding and text generation clients.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by external embedding or generation providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, connect, timeout, reset).
    #[error("Provider unreachable: {0}")]
    Transport(String),
    /// The provider answered with a non-success status code.
    #[error("Provider returned {status}: {body}")]
    Status {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Response body, kept for diagnostics.
        body: String,
    },
    /// The provider answered successfully but the payload could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether another attempt may succeed.
    ///
    /// Network failures, timeouts, rate limiting, server errors, and other client-side
    /// rejections are retried. Rejected credentials and undecodable payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => {
                !matches!(*status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
                    && (status.is_client_error() || status.is_server_error())
            }
            Self::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}
