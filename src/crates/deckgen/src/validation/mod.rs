//! Turning raw model output into validated structured content.
//!
//! - [`extract`] pulls one JSON value out of the raw text
//! - [`schema`] validates it against the expected shape
//! - [`repair`] re-issues requests with escalating instructions until a valid
//!   value is produced or the attempt ceiling is reached

pub mod extract;
pub mod repair;
pub mod schema;

pub use extract::extract_structured;
pub use repair::{
    generate_with_repair, validate_and_repair, Escalation, RepairPolicy, RepairState, Repaired,
};
pub use schema::{ContentSchema, OutlinePayload, OutlineSchema, SlideDraft, SlideSchema, Validated};

use crate::error::DeckError;

/// Why a response failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No structured value could be parsed.
    Parse,
    /// Parsed, but the content broke the schema.
    Schema,
}

/// A failed validation, carrying the offending raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub reason: String,
    pub raw: String,
}

impl ValidationFailure {
    pub fn parse(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            kind: FailureKind::Parse,
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    pub fn schema(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            kind: FailureKind::Schema,
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

impl From<ValidationFailure> for DeckError {
    fn from(failure: ValidationFailure) -> Self {
        let reason = match failure.kind {
            FailureKind::Parse => format!("parse error: {}", failure.reason),
            FailureKind::Schema => failure.reason,
        };
        DeckError::SchemaViolation {
            reason,
            raw: failure.raw,
        }
    }
}

/// Result of validating one response.
pub type ValidationOutcome<T> = std::result::Result<Validated<T>, ValidationFailure>;
