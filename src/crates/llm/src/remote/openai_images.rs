//! OpenAI image-generation client (`/images/generations`).

use super::openai::check_status;
use crate::config::RemoteLlmConfig;
use crate::error::{ProviderError, Result};
use crate::provider::ImageProvider;
use crate::types::GeneratedImage;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI image API client.
#[derive(Clone)]
pub struct OpenAiImageClient {
    config: RemoteLlmConfig,
    client: Client,
    size: String,
}

impl OpenAiImageClient {
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self {
            config,
            client,
            size: "1024x1024".to_string(),
        })
    }

    /// Set the requested image size (e.g. "1792x1024").
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    fn decode(item: ImageDatum) -> Result<GeneratedImage> {
        if let Some(b64) = item.b64_json {
            let data = STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| ProviderError::provider(format!("Invalid base64 image payload: {e}")))?;
            return Ok(GeneratedImage::Bytes {
                data,
                mime_type: "image/png".to_string(),
            });
        }
        item.url
            .map(GeneratedImage::Url)
            .ok_or_else(|| ProviderError::provider("Image response had neither data nor URL"))
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let url = format!("{}/images/generations", self.config.base_url);
        let body = ImageRequest {
            model: &self.config.model,
            prompt,
            n: 1,
            size: &self.size,
            response_format: "b64_json",
        };
        debug!(model = %self.config.model, "requesting image");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::provider(format!("Invalid image response: {e}")))?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::provider("Image response was empty"))?;
        Self::decode(first)
    }

    fn name(&self) -> &str {
        "openai-images"
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}
