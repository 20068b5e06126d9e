//! Chat and image provider clients for deckgen.
//!
//! This crate wraps individual calls to external model providers. Each call
//! carries authentication and a timeout, and every failure is classified into a
//! [`ProviderError`] so higher layers never see provider-specific error types.
//!
//! # Providers
//!
//! - **OpenAI** - chat completions and model listing ([`remote::OpenAiClient`])
//! - **OpenAI Images** - image generation ([`remote::OpenAiImageClient`])
//! - **Imagen** - preferred image generator, currently unavailable ([`remote::ImagenClient`])
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::{ChatProvider, ChatRequest, RemoteLlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "OPENAI_API_KEY",
//!         "https://api.openai.com/v1",
//!         "gpt-4o-mini",
//!     )?;
//!     let client = OpenAiClient::new(config)?;
//!
//!     let request = ChatRequest::new("Answer briefly.", "What is photosynthesis?");
//!     println!("{}", client.complete(&request).await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

#[cfg(feature = "remote")]
pub mod remote;

pub use config::RemoteLlmConfig;
pub use error::{ProviderError, Result};
pub use provider::{ChatProvider, ImageProvider};
pub use types::{ChatMessage, ChatRequest, ChatRole, GeneratedImage, ModelInfo};
