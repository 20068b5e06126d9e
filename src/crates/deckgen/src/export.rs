//! Deck export boundary.

use crate::error::{DeckError, Result};
use crate::models::SlideContent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Serializes a finished deck and returns where it was written.
#[async_trait]
pub trait DeckExporter: Send + Sync {
    async fn export(&self, title: &str, slides: &[SlideContent]) -> Result<PathBuf>;
}

/// Document written by [`JsonDeckExporter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckDocument {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub slides: Vec<SlideContent>,
}

/// Writes decks as pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct JsonDeckExporter {
    dir: PathBuf,
}

impl JsonDeckExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn file_stem(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "deck".to_string()
    } else {
        slug
    }
}

#[async_trait]
impl DeckExporter for JsonDeckExporter {
    async fn export(&self, title: &str, slides: &[SlideContent]) -> Result<PathBuf> {
        if slides.is_empty() {
            return Err(DeckError::InvalidRequest("deck has no slides".to_string()));
        }

        let document = DeckDocument {
            title: title.to_string(),
            generated_at: Utc::now(),
            slides: slides.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&document)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let short_id = Uuid::new_v4().simple().to_string();
        let path = self
            .dir
            .join(format!("{}-{}.json", file_stem(title), &short_id[..8]));
        tokio::fs::write(&path, json).await?;

        info!(path = %path.display(), slides = slides.len(), "deck exported");
        Ok(path)
    }
}
