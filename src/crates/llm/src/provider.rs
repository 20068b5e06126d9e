//! Provider traits implemented by every chat and image backend.

use crate::error::Result;
use crate::types::{ChatRequest, GeneratedImage, ModelInfo};
use async_trait::async_trait;

/// A chat-completion provider.
///
/// Implementations perform exactly one network call per method invocation and
/// never retry internally; retry policy belongs to the caller.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a chat request and return the raw assistant text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Fetch the list of models the provider exposes.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Provider name used in logs and provenance.
    fn name(&self) -> &str;
}

/// An image-generation provider.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate a single image for the prompt.
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;

    /// Provider name used in logs and provenance.
    fn name(&self) -> &str;
}
