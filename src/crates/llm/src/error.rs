//! Error types for provider calls.
//!
//! Every provider-specific failure is normalized into [`ProviderError`] before it
//! leaves this crate, so callers only ever reason about four kinds of failure.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Normalized provider failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Credentials were rejected or are missing. Never retried.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider reported that its own quota or rate limit was hit.
    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    /// Network failure or timeout; the same request may succeed later.
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// Any other provider failure. The provider's message is kept verbatim.
    #[error("Provider error{}: {message}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    Provider {
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
        /// Message reported by the provider.
        message: String,
    },
}

impl ProviderError {
    /// Build a generic provider error without an HTTP status.
    pub fn provider(message: impl Into<String>) -> Self {
        ProviderError::Provider {
            status: None,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => ProviderError::Authentication(body),
            429 => ProviderError::RateLimited(body),
            408 | 502 | 503 | 504 => ProviderError::Transient(format!("HTTP {status}: {body}")),
            _ => ProviderError::Provider {
                status: Some(status),
                message: body,
            },
        }
    }

    /// Check if the same request may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_) | ProviderError::Transient(_)
        )
    }

    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ProviderError::Authentication(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return ProviderError::Transient(err.to_string());
        }
        match err.status() {
            Some(status) => ProviderError::from_status(status.as_u16(), err.to_string()),
            None => ProviderError::provider(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::provider(format!("Malformed provider response: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ProviderError::from_status(401, "bad key").is_auth_error());
        assert!(ProviderError::from_status(403, "forbidden").is_auth_error());
        assert_eq!(
            ProviderError::from_status(429, "slow down"),
            ProviderError::RateLimited("slow down".to_string())
        );
        assert!(matches!(
            ProviderError::from_status(503, "overloaded"),
            ProviderError::Transient(_)
        ));
        assert_eq!(
            ProviderError::from_status(400, "bad prompt"),
            ProviderError::Provider {
                status: Some(400),
                message: "bad prompt".to_string()
            }
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ProviderError::Transient("timeout".into()).is_retryable());
        assert!(ProviderError::RateLimited("429".into()).is_retryable());
        assert!(!ProviderError::Authentication("401".into()).is_retryable());
        assert!(!ProviderError::provider("boom").is_retryable());
    }

    #[test]
    fn test_provider_message_preserved() {
        let err = ProviderError::from_status(500, "model exploded");
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("model exploded"));
    }
}
