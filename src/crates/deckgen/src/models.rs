//! Request and result types for deck generation.

use crate::error::{DeckError, Result};
use crate::layout::{FieldKind, Layout};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Allowed number of topics per outline request.
pub const TOPIC_COUNT_RANGE: RangeInclusive<usize> = 1..=20;

/// Allowed number of key points per topic.
pub const KEY_POINT_RANGE: RangeInclusive<usize> = 3..=5;

/// Audience tier, ordered from youngest to most specialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionalLevel {
    Elementary,
    MiddleSchool,
    HighSchool,
    University,
    Professional,
}

impl InstructionalLevel {
    pub const ALL: [InstructionalLevel; 5] = [
        InstructionalLevel::Elementary,
        InstructionalLevel::MiddleSchool,
        InstructionalLevel::HighSchool,
        InstructionalLevel::University,
        InstructionalLevel::Professional,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InstructionalLevel::Elementary => "elementary",
            InstructionalLevel::MiddleSchool => "middle_school",
            InstructionalLevel::HighSchool => "high_school",
            InstructionalLevel::University => "university",
            InstructionalLevel::Professional => "professional",
        }
    }

    /// Audience description used when prompting.
    pub fn audience(self) -> &'static str {
        match self {
            InstructionalLevel::Elementary => {
                "elementary school students (ages 6-11); use simple words and concrete examples"
            }
            InstructionalLevel::MiddleSchool => {
                "middle school students (ages 11-14); introduce terminology gently"
            }
            InstructionalLevel::HighSchool => {
                "high school students (ages 14-18); use correct terminology with brief explanations"
            }
            InstructionalLevel::University => {
                "university students; assume foundational knowledge and be precise"
            }
            InstructionalLevel::Professional => {
                "working professionals; be concise, technical and practical"
            }
        }
    }
}

impl std::fmt::Display for InstructionalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstructionalLevel {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        InstructionalLevel::ALL
            .into_iter()
            .find(|l| l.as_str() == normalized)
            .ok_or_else(|| DeckError::InvalidRequest(format!("unknown instructional level: {s}")))
    }
}

/// Validated outline request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineRequest {
    context: String,
    count: usize,
    level: InstructionalLevel,
}

impl OutlineRequest {
    pub fn new(context: impl Into<String>, count: usize, level: InstructionalLevel) -> Result<Self> {
        let context = context.into().trim().to_string();
        if context.is_empty() {
            return Err(DeckError::InvalidRequest("context must not be empty".to_string()));
        }
        if !TOPIC_COUNT_RANGE.contains(&count) {
            return Err(DeckError::InvalidRequest(format!(
                "count must be between {} and {}, got {count}",
                TOPIC_COUNT_RANGE.start(),
                TOPIC_COUNT_RANGE.end()
            )));
        }
        Ok(Self {
            context,
            count,
            level,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn level(&self) -> InstructionalLevel {
        self.level
    }
}

/// A generated outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
}

impl Topic {
    pub fn new(title: impl Into<String>, key_points: Vec<String>) -> Self {
        Self {
            title: title.into(),
            key_points,
            image_prompt: None,
        }
    }

    pub fn with_image_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    /// Reject topics a caller supplies directly (slide generation input).
    pub fn ensure_valid(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(DeckError::InvalidRequest("topic title must not be empty".to_string()));
        }
        if self.key_points.iter().any(|p| p.trim().is_empty()) {
            return Err(DeckError::InvalidRequest("topic key points must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Outline result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub topics: Vec<Topic>,
    pub warnings: Vec<String>,
    /// Provider calls made, including the first.
    pub attempts: u32,
}

/// Which image provider produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageProvenance {
    Primary,
    Secondary,
    /// No image was produced; the reference is a placeholder.
    None,
}

/// A stored image and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub reference: String,
    pub provenance: ImageProvenance,
    /// Name of the provider that produced it, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Reference used when image generation fails entirely.
pub const IMAGE_PLACEHOLDER: &str = "placeholder://image-unavailable";

impl ImageAsset {
    pub fn placeholder() -> Self {
        Self {
            reference: IMAGE_PLACEHOLDER.to_string(),
            provenance: ImageProvenance::None,
            provider: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.provenance == ImageProvenance::None
    }
}

/// Value of one slide field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Image(ImageAsset),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::List(_) => FieldKind::List,
            FieldValue::Image(_) => FieldKind::Image,
        }
    }

    /// Empty value of the given kind.
    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::List => FieldValue::List(Vec::new()),
            FieldKind::Image => FieldValue::Image(ImageAsset::placeholder()),
        }
    }
}

/// A named slide field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideField {
    pub name: String,
    #[serde(flatten)]
    pub value: FieldValue,
}

/// Generated content for one slide.
///
/// `fields` always matches the field list of `layout`, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    pub title: String,
    pub layout: Layout,
    pub fields: Vec<SlideField>,
}

impl SlideContent {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Provenance of the slide image, if the layout has one.
    pub fn image_provenance(&self) -> ImageProvenance {
        self.fields
            .iter()
            .find_map(|f| match &f.value {
                FieldValue::Image(asset) => Some(asset.provenance),
                _ => None,
            })
            .unwrap_or(ImageProvenance::None)
    }

    /// True if populated fields match the layout schema exactly.
    pub fn matches_layout(&self) -> bool {
        let specs = self.layout.fields();
        specs.len() == self.fields.len()
            && specs
                .iter()
                .zip(&self.fields)
                .all(|(spec, field)| spec.name == field.name && spec.kind == field.value.kind())
    }
}
