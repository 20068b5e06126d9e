//! Single provider calls with a wall-clock timeout and error classification.
//!
//! The gateway never retries. Retry policy lives in the repair loop and the
//! image fallback so that quota accounting stays in one place.

use crate::error::{DeckError, Result};
use crate::quota::OperationCategory;
use llm::{ChatProvider, ChatRequest, GeneratedImage, ImageProvider, ModelInfo};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for one provider call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Wraps provider calls with a timeout and normalizes their errors.
#[derive(Clone)]
pub struct Gateway {
    chat: Arc<dyn ChatProvider>,
    timeout: Duration,
}

impl Gateway {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self {
            chat,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn chat_provider(&self) -> &str {
        self.chat.name()
    }

    /// One chat completion.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.call(OperationCategory::Chat, self.chat.name(), self.chat.complete(request))
            .await
    }

    /// One image generation against the given provider.
    pub async fn image(
        &self,
        category: OperationCategory,
        provider: &dyn ImageProvider,
        prompt: &str,
    ) -> Result<GeneratedImage> {
        self.call(category, provider.name(), provider.generate(prompt))
            .await
    }

    /// Models exposed by the chat provider.
    pub async fn models(&self) -> Result<Vec<ModelInfo>> {
        self.call(OperationCategory::ModelList, self.chat.name(), self.chat.list_models())
            .await
    }

    async fn call<T, F>(&self, category: OperationCategory, provider: &str, fut: F) -> Result<T>
    where
        F: Future<Output = llm::Result<T>>,
    {
        debug!(%category, provider, "calling provider");
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(%category, provider, error = %err, "provider call failed");
                Err(DeckError::from_provider(category, err))
            }
            Err(_) => {
                warn!(%category, provider, timeout_secs = self.timeout.as_secs(), "provider call timed out");
                Err(DeckError::TransientProviderError(format!(
                    "{provider} did not respond within {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("chat", &self.chat.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
