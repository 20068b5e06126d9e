//! Content schemas for outline and slide responses.

use crate::layout::{FieldKind, Layout};
use crate::models::{FieldValue, SlideField, Topic, KEY_POINT_RANGE};
use serde::Deserialize;
use serde_json::{Map, Value};

/// A validated value plus non-fatal notes (e.g. dropped items).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Validated<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }
}

/// Shape a response must satisfy.
///
/// Validation is pure: it never performs I/O.
pub trait ContentSchema {
    type Output;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Example of the exact JSON shape expected. The simplified shape drops
    /// optional members.
    fn shape(&self, simplified: bool) -> String;

    /// The acceptable "nothing usable" answer.
    fn empty_shape(&self) -> &'static str;

    /// Validate a parsed value, returning the reason on failure.
    fn validate(&self, value: &Value) -> Result<Validated<Self::Output>, String>;
}

/// Accepted outline payload shapes, normalized to a list of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutlinePayload {
    /// `{"topics": [...]}`
    Wrapped { topics: Vec<Value> },
    /// `[...]`
    List(Vec<Value>),
    /// A single topic object.
    Single(Map<String, Value>),
}

impl OutlinePayload {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            OutlinePayload::Wrapped { topics } => topics,
            OutlinePayload::List(items) => items,
            OutlinePayload::Single(object) => vec![Value::Object(object)],
        }
    }
}

fn non_empty_string(value: Option<&Value>, field: &str) -> Result<String, String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(format!("'{field}' is empty")),
        Some(_) => Err(format!("'{field}' must be a string")),
        None => Err(format!("missing '{field}'")),
    }
}

fn string_list(value: Option<&Value>, field: &str) -> Result<Vec<String>, String> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(format!("'{field}' must be a list")),
        None => return Err(format!("missing '{field}'")),
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(format!("'{field}[{i}]' must be a non-empty string")),
        })
        .collect()
}

/// Outline responses: a list of topics with 3-5 key points each.
#[derive(Debug, Clone)]
pub struct OutlineSchema {
    max_topics: usize,
}

impl OutlineSchema {
    pub fn new(max_topics: usize) -> Self {
        Self { max_topics }
    }

    fn validate_topic(item: &Value) -> Result<Topic, String> {
        let object = item.as_object().ok_or("topic must be an object")?;
        let title = non_empty_string(object.get("title"), "title")?;
        let points_value = object
            .get("key_points")
            .or_else(|| object.get("keyPoints"))
            .or_else(|| object.get("description"));
        let key_points = string_list(points_value, "key_points")?;
        if !KEY_POINT_RANGE.contains(&key_points.len()) {
            return Err(format!(
                "'{title}' has {} key points, expected {}-{}",
                key_points.len(),
                KEY_POINT_RANGE.start(),
                KEY_POINT_RANGE.end()
            ));
        }
        let image_prompt = match object.get("image_prompt") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        };
        Ok(Topic {
            title,
            key_points,
            image_prompt,
        })
    }
}

impl ContentSchema for OutlineSchema {
    type Output = Vec<Topic>;

    fn name(&self) -> &str {
        "outline"
    }

    fn shape(&self, simplified: bool) -> String {
        if simplified {
            r#"{"topics": [{"title": "string", "key_points": ["string", "string", "string"]}]}"#
                .to_string()
        } else {
            r#"{"topics": [{"title": "string", "key_points": ["string", "string", "string"], "image_prompt": "string"}]}"#
                .to_string()
        }
    }

    fn empty_shape(&self) -> &'static str {
        r#"{"topics": []}"#
    }

    fn validate(&self, value: &Value) -> Result<Validated<Vec<Topic>>, String> {
        let items = OutlinePayload::deserialize(value)
            .map_err(|_| "expected a topic list, a {\"topics\": [...]} object or a single topic".to_string())?
            .into_items();

        let mut warnings = Vec::new();
        let mut topics = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match Self::validate_topic(item) {
                Ok(topic) => topics.push(topic),
                Err(reason) => warnings.push(format!("dropped topic {}: {reason}", index + 1)),
            }
        }

        if topics.is_empty() {
            return Err(if warnings.is_empty() {
                "response contained no topics".to_string()
            } else {
                format!("no valid topics ({})", warnings.join("; "))
            });
        }

        if topics.len() > self.max_topics {
            warnings.push(format!(
                "provider returned {} topics, keeping the first {}",
                topics.len(),
                self.max_topics
            ));
            topics.truncate(self.max_topics);
        }

        Ok(Validated {
            value: topics,
            warnings,
        })
    }
}

/// Text content for a slide before any image is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideDraft {
    pub title: Option<String>,
    /// Non-image fields, in layout order.
    pub fields: Vec<SlideField>,
    pub image_prompt: Option<String>,
}

/// Slide responses: one member per non-image field of the layout.
#[derive(Debug, Clone)]
pub struct SlideSchema {
    layout: Layout,
}

/// Bounds on list fields in slide content.
const MAX_LIST_ITEMS: usize = 8;

impl SlideSchema {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl ContentSchema for SlideSchema {
    type Output = SlideDraft;

    fn name(&self) -> &str {
        "slide"
    }

    fn shape(&self, simplified: bool) -> String {
        let mut shape = Map::new();
        shape.insert("title".to_string(), Value::from("string"));
        for spec in self.layout.text_fields() {
            let example = match spec.kind {
                FieldKind::List => Value::from(vec!["string", "string", "string"]),
                _ => Value::from("string"),
            };
            shape.insert(spec.name.to_string(), example);
        }
        if self.layout.has_image() && !simplified {
            shape.insert("image_prompt".to_string(), Value::from("string"));
        }
        Value::Object(shape).to_string()
    }

    fn empty_shape(&self) -> &'static str {
        "{}"
    }

    fn validate(&self, value: &Value) -> Result<Validated<SlideDraft>, String> {
        let object = value
            .get("slide")
            .unwrap_or(value)
            .as_object()
            .ok_or("slide content must be an object")?;

        let mut fields = Vec::new();
        for spec in self.layout.text_fields() {
            let field_value = match spec.kind {
                FieldKind::Text => FieldValue::Text(non_empty_string(object.get(spec.name), spec.name)?),
                FieldKind::List => {
                    let items = string_list(object.get(spec.name), spec.name)?;
                    if items.is_empty() || items.len() > MAX_LIST_ITEMS {
                        return Err(format!(
                            "'{}' has {} items, expected 1-{MAX_LIST_ITEMS}",
                            spec.name,
                            items.len()
                        ));
                    }
                    FieldValue::List(items)
                }
                FieldKind::Image => continue,
            };
            fields.push(SlideField {
                name: spec.name.to_string(),
                value: field_value,
            });
        }

        let optional = |key: &str| match object.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        };

        Ok(Validated::new(SlideDraft {
            title: optional("title"),
            fields,
            image_prompt: optional("image_prompt"),
        }))
    }
}
