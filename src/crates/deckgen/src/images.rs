//! Image generation with a preferred provider and a secondary fallback.

use crate::error::{DeckError, Result};
use crate::gateway::Gateway;
use crate::models::ImageProvenance;
use crate::quota::{OperationCategory, QuotaTracker};
use llm::{GeneratedImage, ImageProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// A generated image and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub image: GeneratedImage,
    pub provenance: ImageProvenance,
    pub provider: String,
}

/// Tries the primary image provider, then the secondary.
///
/// Any primary failure, including a fail-fast quota denial, is logged and
/// absorbed. Only when the secondary also fails does the caller see an error.
pub struct FallbackSelector {
    primary: Arc<dyn ImageProvider>,
    secondary: Arc<dyn ImageProvider>,
    tracker: Arc<QuotaTracker>,
    gateway: Gateway,
}

impl FallbackSelector {
    pub fn new(
        primary: Arc<dyn ImageProvider>,
        secondary: Arc<dyn ImageProvider>,
        tracker: Arc<QuotaTracker>,
        gateway: Gateway,
    ) -> Self {
        Self {
            primary,
            secondary,
            tracker,
            gateway,
        }
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<ImageResult> {
        let primary_err = match self
            .attempt(OperationCategory::ImagePrimary, self.primary.as_ref(), prompt)
            .await
        {
            Ok(image) => {
                return Ok(ImageResult {
                    image,
                    provenance: ImageProvenance::Primary,
                    provider: self.primary.name().to_string(),
                })
            }
            Err(err) => err,
        };
        warn!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            error = %primary_err,
            "primary image provider failed, falling back"
        );

        match self
            .attempt(OperationCategory::ImageFallback, self.secondary.as_ref(), prompt)
            .await
        {
            Ok(image) => {
                info!(provider = self.secondary.name(), "image generated by secondary provider");
                Ok(ImageResult {
                    image,
                    provenance: ImageProvenance::Secondary,
                    provider: self.secondary.name().to_string(),
                })
            }
            Err(secondary_err) => {
                warn!(error = %secondary_err, "secondary image provider failed");
                let reason = format!(
                    "all image providers failed: {}: {primary_err}; {}: {secondary_err}",
                    self.primary.name(),
                    self.secondary.name()
                );
                Err(DeckError::generation_failed(reason, None, Some(&secondary_err)))
            }
        }
    }

    async fn attempt(
        &self,
        category: OperationCategory,
        provider: &dyn ImageProvider,
        prompt: &str,
    ) -> Result<GeneratedImage> {
        let max_retries = self.tracker.policy().max_retries;
        self.tracker.await_admission(category, max_retries).await?;
        self.gateway.image(category, provider, prompt).await
    }
}

impl std::fmt::Debug for FallbackSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSelector")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .finish()
    }
}
