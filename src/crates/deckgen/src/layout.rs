//! Static slide layout table and layout switching.

use crate::error::{DeckError, Result};
use crate::models::{FieldValue, SlideContent, SlideField};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Content type of a layout field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Freeform text.
    Text,
    /// List of bullet strings.
    List,
    /// Image reference.
    Image,
}

impl FieldKind {
    fn convertible_to(self, other: FieldKind) -> bool {
        matches!(
            (self, other),
            (FieldKind::Text, FieldKind::List) | (FieldKind::List, FieldKind::Text)
        )
    }
}

/// One declared field of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// What the model should put in the field.
    pub hint: &'static str,
}

const fn field(name: &'static str, kind: FieldKind, hint: &'static str) -> FieldSpec {
    FieldSpec { name, kind, hint }
}

const BULLETS: &[FieldSpec] = &[field(
    "bullets",
    FieldKind::List,
    "3 to 6 short bullet points",
)];
const BODY: &[FieldSpec] = &[field(
    "body",
    FieldKind::Text,
    "one or two explanatory paragraphs",
)];
const TWO_COLUMN: &[FieldSpec] = &[
    field("left", FieldKind::List, "bullet points for the left column"),
    field("right", FieldKind::List, "bullet points for the right column"),
];
const IMAGE_BULLETS: &[FieldSpec] = &[
    field("bullets", FieldKind::List, "3 to 5 short bullet points"),
    field("image", FieldKind::Image, "illustration"),
];
const IMAGE_CAPTION: &[FieldSpec] = &[
    field("image", FieldKind::Image, "illustration"),
    field("caption", FieldKind::Text, "a one-sentence caption"),
];

/// Slide layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Bullets,
    Body,
    TwoColumn,
    ImageBullets,
    ImageCaption,
}

impl Layout {
    pub const ALL: [Layout; 5] = [
        Layout::Bullets,
        Layout::Body,
        Layout::TwoColumn,
        Layout::ImageBullets,
        Layout::ImageCaption,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Bullets => "bullets",
            Layout::Body => "body",
            Layout::TwoColumn => "two_column",
            Layout::ImageBullets => "image_bullets",
            Layout::ImageCaption => "image_caption",
        }
    }

    /// Ordered field list for this layout.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Layout::Bullets => BULLETS,
            Layout::Body => BODY,
            Layout::TwoColumn => TWO_COLUMN,
            Layout::ImageBullets => IMAGE_BULLETS,
            Layout::ImageCaption => IMAGE_CAPTION,
        }
    }

    pub fn has_image(self) -> bool {
        self.fields().iter().any(|f| f.kind == FieldKind::Image)
    }

    /// Fields the language model is expected to fill (everything but images).
    pub fn text_fields(self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields().iter().filter(|f| f.kind != FieldKind::Image)
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        Layout::ALL
            .into_iter()
            .find(|l| l.as_str() == s.trim())
            .ok_or_else(|| DeckError::InvalidRequest(format!("unrecognized layout: {s}")))
    }
}

/// Join bullets into freeform text, one per line.
pub fn join_lines(items: &[String]) -> String {
    items.join("\n")
}

/// Split freeform text into bullets, dropping blank lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn convert(value: FieldValue, kind: FieldKind) -> FieldValue {
    match (value, kind) {
        (FieldValue::List(items), FieldKind::Text) => FieldValue::Text(join_lines(&items)),
        (FieldValue::Text(text), FieldKind::List) => FieldValue::List(split_lines(&text)),
        (value, _) => value,
    }
}

/// Re-map a finished slide onto another layout.
///
/// Each target field takes, in order of preference: the unused source field
/// with the same name and kind, the first unused source field of the same
/// kind, or the first unused text/list field converted by joining or splitting
/// on line breaks. Target fields with no counterpart are left empty; unused
/// source fields are dropped.
pub fn switch_layout(slide: &SlideContent, target: Layout) -> SlideContent {
    let mut unused: Vec<Option<&SlideField>> = slide.fields.iter().map(Some).collect();

    let mut take = |pred: &dyn Fn(&SlideField) -> bool| -> Option<FieldValue> {
        unused
            .iter_mut()
            .find(|slot| slot.is_some_and(pred))
            .and_then(Option::take)
            .map(|f| f.value.clone())
    };

    let fields = target
        .fields()
        .iter()
        .map(|spec| {
            let value = take(&|f: &SlideField| f.name == spec.name && f.value.kind() == spec.kind)
                .or_else(|| take(&|f: &SlideField| f.value.kind() == spec.kind))
                .or_else(|| take(&|f: &SlideField| f.value.kind().convertible_to(spec.kind)))
                .map(|v| convert(v, spec.kind))
                .unwrap_or_else(|| FieldValue::empty(spec.kind));
            SlideField {
                name: spec.name.to_string(),
                value,
            }
        })
        .collect();

    SlideContent {
        title: slide.title.clone(),
        layout: target,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageAsset, ImageProvenance};
    use proptest::prelude::*;

    fn bullets_slide(items: &[&str]) -> SlideContent {
        SlideContent {
            title: "Light reactions".to_string(),
            layout: Layout::Bullets,
            fields: vec![SlideField {
                name: "bullets".to_string(),
                value: FieldValue::List(items.iter().map(|s| s.to_string()).collect()),
            }],
        }
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("two_column".parse::<Layout>().unwrap(), Layout::TwoColumn);
        assert!(matches!(
            "three_column".parse::<Layout>(),
            Err(DeckError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_bullets_to_body_joins_lines() {
        let slide = bullets_slide(&["Chlorophyll absorbs light", "Water is split"]);
        let body = switch_layout(&slide, Layout::Body);

        assert!(body.matches_layout());
        assert_eq!(
            body.field("body"),
            Some(&FieldValue::Text(
                "Chlorophyll absorbs light\nWater is split".to_string()
            ))
        );
    }

    #[test]
    fn test_body_to_bullets_splits_without_empty_entries() {
        let slide = SlideContent {
            title: "t".to_string(),
            layout: Layout::Body,
            fields: vec![SlideField {
                name: "body".to_string(),
                value: FieldValue::Text("first\n\n  second  \n".to_string()),
            }],
        };
        let bullets = switch_layout(&slide, Layout::Bullets);
        assert_eq!(
            bullets.field("bullets"),
            Some(&FieldValue::List(vec!["first".to_string(), "second".to_string()]))
        );
    }

    #[test]
    fn test_image_preserved_and_caption_created() {
        let asset = ImageAsset {
            reference: "/images/a.png".to_string(),
            provenance: ImageProvenance::Secondary,
            provider: Some("openai-images".to_string()),
        };
        let slide = SlideContent {
            title: "t".to_string(),
            layout: Layout::ImageBullets,
            fields: vec![
                SlideField {
                    name: "bullets".to_string(),
                    value: FieldValue::List(vec!["a".to_string(), "b".to_string()]),
                },
                SlideField {
                    name: "image".to_string(),
                    value: FieldValue::Image(asset.clone()),
                },
            ],
        };

        let switched = switch_layout(&slide, Layout::ImageCaption);
        assert!(switched.matches_layout());
        assert_eq!(switched.field("image"), Some(&FieldValue::Image(asset)));
        assert_eq!(
            switched.field("caption"),
            Some(&FieldValue::Text("a\nb".to_string()))
        );
    }

    #[test]
    fn test_incompatible_fields_dropped() {
        let slide = SlideContent {
            title: "t".to_string(),
            layout: Layout::ImageCaption,
            fields: vec![
                SlideField {
                    name: "image".to_string(),
                    value: FieldValue::Image(ImageAsset::placeholder()),
                },
                SlideField {
                    name: "caption".to_string(),
                    value: FieldValue::Text("A leaf".to_string()),
                },
            ],
        };
        let switched = switch_layout(&slide, Layout::Bullets);
        assert_eq!(switched.fields.len(), 1);
        assert_eq!(
            switched.field("bullets"),
            Some(&FieldValue::List(vec!["A leaf".to_string()]))
        );
        assert_eq!(switched.image_provenance(), ImageProvenance::None);
    }

    #[test]
    fn test_two_column_from_bullets_fills_missing_column_empty() {
        let switched = switch_layout(&bullets_slide(&["x", "y"]), Layout::TwoColumn);
        assert!(switched.matches_layout());
        assert_eq!(
            switched.field("left"),
            Some(&FieldValue::List(vec!["x".to_string(), "y".to_string()]))
        );
        assert_eq!(switched.field("right"), Some(&FieldValue::List(vec![])));
    }

    proptest! {
        #[test]
        fn prop_bullets_body_roundtrip(items in proptest::collection::vec("[A-Za-z][A-Za-z ]{0,20}[A-Za-z]", 1..8)) {
            let refs: Vec<&str> = items.iter().map(String::as_str).collect();
            let slide = bullets_slide(&refs);
            let back = switch_layout(&switch_layout(&slide, Layout::Body), Layout::Bullets);

            match back.field("bullets") {
                Some(FieldValue::List(out)) => {
                    prop_assert!(out.iter().all(|s| !s.is_empty()));
                    prop_assert_eq!(out, &items);
                }
                other => prop_assert!(false, "unexpected field {:?}", other),
            }
        }
    }
}
