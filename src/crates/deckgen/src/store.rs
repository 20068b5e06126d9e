//! Durable storage for generated images.

use crate::error::Result;
use async_trait::async_trait;
use llm::GeneratedImage;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Persists generated images and returns a stable reference.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, image: &GeneratedImage) -> Result<String>;
}

/// Writes image bytes to a directory under random file names.
///
/// Images the provider already hosts are returned by URL unchanged.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    dir: PathBuf,
    public_prefix: String,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store(&self, image: &GeneratedImage) -> Result<String> {
        let data = match image {
            GeneratedImage::Url(url) => return Ok(url.clone()),
            GeneratedImage::Bytes { data, .. } => data,
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), image.extension());
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, data).await?;
        debug!(path = %path.display(), bytes = data.len(), "stored image");

        Ok(format!("{}/{}", self.public_prefix.trim_end_matches('/'), file_name))
    }
}
