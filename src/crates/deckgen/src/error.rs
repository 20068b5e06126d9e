//! Error taxonomy for generation orchestration.

use crate::quota::OperationCategory;
use llm::ProviderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for deckgen operations.
pub type Result<T> = std::result::Result<T, DeckError>;

/// Where a quota denial originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaOrigin {
    /// Denied by the local quota tracker before any network call.
    Local,
    /// Reported by the provider (HTTP 429 or equivalent).
    Provider,
}

impl std::fmt::Display for QuotaOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaOrigin::Local => write!(f, "local"),
            QuotaOrigin::Provider => write!(f, "provider"),
        }
    }
}

/// Errors that can occur while generating deck content.
#[derive(Debug, Clone, Error)]
pub enum DeckError {
    /// Caller error; never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Local or provider-reported quota exhaustion.
    #[error("Quota exceeded for {category} ({origin}): {message}")]
    QuotaExceeded {
        category: OperationCategory,
        origin: QuotaOrigin,
        fail_fast: bool,
        message: String,
    },

    /// Credentials rejected; indicates misconfiguration.
    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),

    /// Network failure or timeout.
    #[error("Transient provider error: {0}")]
    TransientProviderError(String),

    /// Any other provider failure, with the provider's message preserved.
    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    /// Well-formed output that failed validation.
    #[error("Schema violation: {reason}")]
    SchemaViolation { reason: String, raw: String },

    /// All attempts exhausted.
    #[error("Generation failed: {reason}")]
    GenerationFailed {
        reason: String,
        last_raw: Option<String>,
        recommendations: Vec<String>,
    },

    /// Startup configuration problem (missing credential, unreadable config).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeckError {
    /// Build a terminal failure, attaching recommendations for the last cause.
    pub fn generation_failed(
        reason: impl Into<String>,
        last_raw: Option<String>,
        cause: Option<&DeckError>,
    ) -> Self {
        DeckError::GenerationFailed {
            reason: reason.into(),
            last_raw,
            recommendations: cause.map(DeckError::recommendations).unwrap_or_else(|| {
                vec!["Try a different topic or rephrase the context".to_string()]
            }),
        }
    }

    /// Errors that must surface immediately without consuming retries.
    pub fn is_fatal(&self) -> bool {
        match self {
            DeckError::InvalidRequest(_)
            | DeckError::AuthenticationFailure(_)
            | DeckError::Config(_) => true,
            DeckError::QuotaExceeded { fail_fast, .. } => *fail_fast,
            _ => false,
        }
    }

    /// Actionable guidance for the end user.
    pub fn recommendations(&self) -> Vec<String> {
        let tips = match self {
            DeckError::InvalidRequest(_) => vec!["Check the request parameters and try again"],
            DeckError::QuotaExceeded { .. } => vec![
                "Reduce request frequency",
                "Wait a minute before generating more content",
            ],
            DeckError::AuthenticationFailure(_) | DeckError::Config(_) => {
                vec!["Verify the configured API credentials"]
            }
            DeckError::TransientProviderError(_) | DeckError::ProviderFailure(_) => vec![
                "Retry in a few moments",
                "Check the provider status page",
            ],
            DeckError::SchemaViolation { .. } => vec![
                "Try a different topic",
                "Simplify or shorten the context",
            ],
            DeckError::GenerationFailed {
                recommendations, ..
            } => return recommendations.clone(),
        };
        tips.into_iter().map(String::from).collect()
    }

    /// Attach the category a provider error was raised under.
    pub fn from_provider(category: OperationCategory, err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited(message) => DeckError::QuotaExceeded {
                category,
                origin: QuotaOrigin::Provider,
                fail_fast: false,
                message,
            },
            other => other.into(),
        }
    }
}

impl From<ProviderError> for DeckError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Authentication(msg) => DeckError::AuthenticationFailure(msg),
            ProviderError::RateLimited(message) => DeckError::QuotaExceeded {
                category: OperationCategory::Chat,
                origin: QuotaOrigin::Provider,
                fail_fast: false,
                message,
            },
            ProviderError::Transient(msg) => DeckError::TransientProviderError(msg),
            err @ ProviderError::Provider { .. } => DeckError::ProviderFailure(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DeckError {
    fn from(err: serde_json::Error) -> Self {
        DeckError::ProviderFailure(format!("Serialization error: {err}"))
    }
}

impl From<std::io::Error> for DeckError {
    fn from(err: std::io::Error) -> Self {
        DeckError::ProviderFailure(format!("I/O error: {err}"))
    }
}
