//! Runtime configuration.
//!
//! Every section has defaults, so an empty or missing file yields a working
//! configuration. String values may reference the environment with
//! `${VAR:default}`.
//!
//! ```yaml
//! providers:
//!   chat:
//!     base_url: ${OPENAI_BASE_URL:https://api.openai.com/v1}
//!     model: gpt-4o-mini
//! quota:
//!   image-primary: { minute_limit: 5, day_limit: 50, cost_weight: 2, fail_fast: true }
//! repair:
//!   max_attempts: 2
//! ```

pub mod loader;

pub use loader::{load_config_file, parse_config};

use crate::error::{DeckError, Result};
use crate::quota::{CategoryLimits, OperationCategory, QuotaPolicy};
use crate::validation::RepairPolicy;
use llm::RemoteLlmConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckgenConfig {
    pub providers: ProvidersConfig,
    /// Per-category overrides of the built-in limits.
    pub quota: BTreeMap<OperationCategory, CategoryLimits>,
    pub repair: RepairPolicy,
    pub timeouts: TimeoutConfig,
    pub backoff: BackoffConfig,
    pub images: ImageStoreConfig,
    pub export: ExportConfig,
}

impl DeckgenConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let config: DeckgenConfig = load_config_file(path)?;
                info!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Quota policy with configured overrides applied.
    pub fn quota_policy(&self) -> QuotaPolicy {
        let mut policy = QuotaPolicy {
            backoff_delay_ms: self.backoff.delay_ms,
            max_retries: self.backoff.max_retries,
            ..QuotaPolicy::default()
        };
        for (category, limits) in &self.quota {
            policy = policy.with_limits(*category, *limits);
        }
        policy
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.provider_call_secs)
    }
}

/// Endpoints and credential variables for each provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub chat: ProviderEndpoint,
    pub image_primary: ProviderEndpoint,
    pub image_secondary: ProviderEndpoint,
    /// Image size requested from the secondary provider.
    pub image_size: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            chat: ProviderEndpoint::new("https://api.openai.com/v1", "gpt-4o-mini", "OPENAI_API_KEY"),
            image_primary: ProviderEndpoint::new(
                "https://generativelanguage.googleapis.com/v1beta",
                "imagen-3.0-generate-002",
                "GOOGLE_API_KEY",
            )
            .optional(),
            image_secondary: ProviderEndpoint::new("https://api.openai.com/v1", "dall-e-3", "OPENAI_API_KEY"),
            image_size: "1024x1024".to_string(),
        }
    }
}

/// One provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// A missing key is fatal at startup unless this is false.
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ProviderEndpoint {
    pub fn new(base_url: &str, model: &str, api_key_env: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key_env: api_key_env.to_string(),
            required: true,
            organization: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Client configuration for this endpoint.
    pub fn client_config(&self, api_key: &str, timeout: Duration) -> RemoteLlmConfig {
        let config = RemoteLlmConfig::new(api_key, &self.base_url, &self.model).with_timeout(timeout);
        match &self.organization {
            Some(org) => config.with_organization(org),
            None => config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub provider_call_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            provider_call_secs: 60,
        }
    }
}

/// Linear backoff for quota admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub delay_ms: u64,
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = QuotaPolicy::default();
        Self {
            delay_ms: policy.backoff_delay_ms,
            max_retries: policy.max_retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageStoreConfig {
    pub output_dir: PathBuf,
    /// Prefix of the references returned for stored images.
    pub public_prefix: String,
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated/images"),
            public_prefix: "/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated/decks"),
        }
    }
}

/// API keys read from the environment at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub chat: String,
    pub image_primary: Option<String>,
    pub image_secondary: String,
}

impl Credentials {
    /// Read every configured key. A missing required key is fatal.
    pub fn from_env(providers: &ProvidersConfig) -> Result<Self> {
        Self::from_lookup(providers, |name| std::env::var(name).ok())
    }

    fn from_lookup(providers: &ProvidersConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |endpoint: &ProviderEndpoint| -> Result<Option<String>> {
            match lookup(&endpoint.api_key_env).filter(|key| !key.trim().is_empty()) {
                Some(key) => Ok(Some(key)),
                None if endpoint.required => Err(DeckError::Config(format!(
                    "missing credential: set {} for {}",
                    endpoint.api_key_env, endpoint.model
                ))),
                None => Ok(None),
            }
        };

        let chat = read(&providers.chat)?;
        let image_primary = read(&providers.image_primary)?;
        let image_secondary = read(&providers.image_secondary)?;

        match (chat, image_secondary) {
            (Some(chat), Some(image_secondary)) => Ok(Self {
                chat,
                image_primary,
                image_secondary,
            }),
            _ => Err(DeckError::Config(
                "chat and secondary image providers must be marked required".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("chat", &"***")
            .field("image_primary", &self.image_primary.as_ref().map(|_| "***"))
            .field("image_secondary", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DeckgenConfig::load(None).unwrap();
        assert_eq!(config.repair, RepairPolicy::default());
        assert_eq!(config.call_timeout(), Duration::from_secs(60));
        assert!(config.quota_policy().limits_for(OperationCategory::ImagePrimary).fail_fast);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let config: DeckgenConfig = parse_config(
            "quota:\n  chat: { minute_limit: 5, day_limit: 50 }\nrepair:\n  max_attempts: 3\nbackoff:\n  delay_ms: 10\n",
        )
        .unwrap();

        let policy = config.quota_policy();
        assert_eq!(policy.limits_for(OperationCategory::Chat).minute_limit, 5);
        assert_eq!(policy.backoff_delay_ms, 10);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(config.repair.max_attempts, 3);
        assert!(config.repair.simplified_fallback);
        assert_eq!(config.providers.chat.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deckgen.yaml");
        std::fs::write(&path, "timeouts:\n  provider_call_secs: 5\n").unwrap();

        let config = DeckgenConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.call_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_missing_required_credential_is_fatal() {
        let providers = ProvidersConfig::default();
        let env: HashMap<&str, &str> = HashMap::new();
        let err = Credentials::from_lookup(&providers, |k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, DeckError::Config(msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn test_optional_primary_credential() {
        let providers = ProvidersConfig::default();
        let env = HashMap::from([("OPENAI_API_KEY", "sk-test")]);
        let creds = Credentials::from_lookup(&providers, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.chat, "sk-test");
        assert_eq!(creds.image_primary, None);
        assert!(!format!("{creds:?}").contains("sk-test"));
    }
}
