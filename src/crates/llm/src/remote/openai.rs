//! OpenAI chat-completions client.
//!
//! Works against any OpenAI-compatible endpoint (`/chat/completions`, `/models`).
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::{ChatProvider, ChatRequest, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env(
//!     "OPENAI_API_KEY",
//!     "https://api.openai.com/v1",
//!     "gpt-4o-mini",
//! )?;
//! let client = OpenAiClient::new(config)?;
//! let text = client.complete(&ChatRequest::new("Reply in JSON.", "Hello!")).await?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{ProviderError, Result};
use crate::provider::ChatProvider;
use crate::types::{ChatMessage, ChatRequest, ChatRole, ModelInfo};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    /// Attach bearer auth and the optional organization header.
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header("Authorization", format!("Bearer {}", self.config.api_key));
        match &self.config.organization {
            Some(org) => req.header("OpenAI-Organization", org),
            None => req,
        }
    }

    fn convert_message(msg: &ChatMessage) -> OpenAiMessage {
        OpenAiMessage {
            role: match msg.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            }
            .to_string(),
            content: Some(msg.content.clone()),
        }
    }

    fn build_body(&self, request: &ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

/// Turn a non-success response into a classified error.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), error_text))
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(model = %self.config.model, messages = request.messages.len(), "sending chat completion");

        let response = self
            .authorize(self.client.post(&url).json(&self.build_body(request)))
            .send()
            .await?;
        let response = check_status(response).await?;

        let openai_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::provider(format!("Invalid response: {e}")))?;

        openai_resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::provider("Response contained no message content"))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.config.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = check_status(response).await?;

        let models: OpenAiModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::provider(format!("Invalid model list: {e}")))?;

        Ok(models
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiModelList {
    data: Vec<OpenAiModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModel {
    id: String,
    #[serde(default)]
    owned_by: Option<String>,
}
