//! Remote provider implementations.
//!
//! - **OpenAI** - chat completions and model listing
//! - **OpenAI Images** - image generation
//! - **Imagen** - Google image generation (currently unavailable)

pub mod imagen;
pub mod openai;
pub mod openai_images;

pub use imagen::ImagenClient;
pub use openai::OpenAiClient;
pub use openai_images::OpenAiImageClient;
