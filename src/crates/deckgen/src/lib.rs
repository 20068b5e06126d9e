//! Generation orchestration for educational slide decks.
//!
//! `deckgen` sits between a web or CLI front end and paid model providers:
//!
//! - [`quota`] - rolling per-minute and per-day budgets per operation category
//! - [`gateway`] - single provider calls with timeouts and normalized errors
//! - [`validation`] - JSON extraction, schema checks and the repair loop
//! - [`images`] - primary image provider with a secondary fallback
//! - [`orchestrator`] - outline, slide, image and deck workflows
//!
//! # Example
//!
//! ```rust,ignore
//! use deckgen::{Credentials, DeckOrchestrator, DeckgenConfig, InstructionalLevel};
//!
//! let config = DeckgenConfig::load(None)?;
//! let credentials = Credentials::from_env(&config.providers)?;
//! let orchestrator = DeckOrchestrator::from_config(&config, &credentials)?;
//!
//! let outline = orchestrator
//!     .generate_outline("Photosynthesis", 3, InstructionalLevel::HighSchool)
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod gateway;
pub mod images;
pub mod layout;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod quota;
pub mod store;
pub mod validation;

pub use config::{Credentials, DeckgenConfig};
pub use error::{DeckError, QuotaOrigin, Result};
pub use export::{DeckDocument, DeckExporter, JsonDeckExporter};
pub use gateway::Gateway;
pub use images::{FallbackSelector, ImageResult};
pub use layout::{switch_layout, FieldKind, FieldSpec, Layout};
pub use models::{
    FieldValue, ImageAsset, ImageProvenance, InstructionalLevel, Outline, OutlineRequest, SlideContent,
    SlideField, Topic, IMAGE_PLACEHOLDER,
};
pub use orchestrator::{Deck, DeckOrchestrator, DeckOrchestratorBuilder};
pub use quota::{CategoryLimits, OperationCategory, QuotaPolicy, QuotaTracker, QuotaUsage};
pub use store::{FsImageStore, ImageStore};
pub use validation::{
    extract_structured, generate_with_repair, validate_and_repair, Escalation, OutlineSchema, RepairPolicy,
    SlideSchema,
};
