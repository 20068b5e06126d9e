//! Configuration shared by the remote provider clients.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a remote provider (OpenAI, Imagen, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    ///
    /// Examples:
    /// - OpenAI: "https://api.openai.com/v1"
    /// - Gemini/Imagen: "https://generativelanguage.googleapis.com/v1beta"
    pub base_url: String,

    /// Model name/identifier.
    pub model: String,

    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Organization ID (optional, for providers that support it).
    pub organization: Option<String>,
}

impl RemoteLlmConfig {
    /// Create a new remote provider configuration.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: default_timeout(),
            organization: None,
        }
    }

    /// Create configuration with the API key taken from an environment variable.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var).map_err(|_| {
            ProviderError::Authentication(format!("API key not found in environment variable {env_var}"))
        })?;
        if api_key.trim().is_empty() {
            return Err(ProviderError::Authentication(format!(
                "environment variable {env_var} is empty"
            )));
        }

        Ok(Self::new(api_key, base_url, model))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the organization ID.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Build an HTTP client honouring the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::provider(format!("Failed to create HTTP client: {e}")))
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_config_builder() {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1", "gpt-4o-mini")
            .with_timeout(Duration::from_secs(120))
            .with_organization("org-123");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.organization, Some("org-123".to_string()));
    }

    #[test]
    fn test_from_env_missing_key_is_auth_error() {
        let err = RemoteLlmConfig::from_env(
            "DECKGEN_TEST_KEY_THAT_IS_NEVER_SET",
            "https://api.openai.com/v1",
            "gpt-4o-mini",
        )
        .unwrap_err();
        assert!(err.is_auth_error());
    }
}
