//! Google Imagen client.
//!
//! Imagen access is currently unavailable for this deployment: the client keeps
//! its configuration so it can be wired like any other provider, but every
//! generation request fails with a provider error. Callers are expected to
//! place it behind a fallback.

use crate::config::RemoteLlmConfig;
use crate::error::{ProviderError, Result};
use crate::provider::ImageProvider;
use crate::types::GeneratedImage;
use async_trait::async_trait;
use tracing::debug;

/// Imagen image provider (currently unavailable).
#[derive(Debug, Clone)]
pub struct ImagenClient {
    config: RemoteLlmConfig,
}

impl ImagenClient {
    pub fn new(config: RemoteLlmConfig) -> Self {
        Self { config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ImageProvider for ImagenClient {
    async fn generate(&self, _prompt: &str) -> Result<GeneratedImage> {
        debug!(model = %self.config.model, "imagen requested but unavailable");
        Err(ProviderError::provider(format!(
            "image generation with {} is currently unavailable",
            self.config.model
        )))
    }

    fn name(&self) -> &str {
        "imagen"
    }
}
