//! Outline, slide, image and deck workflows.
//!
//! Every workflow follows the same path: validate the request, wait for quota
//! admission, call the provider through the [`Gateway`], validate and repair
//! the response, and (for slides with an image field) run the image fallback.

use crate::config::{Credentials, DeckgenConfig};
use crate::error::{DeckError, Result};
use crate::export::{DeckExporter, JsonDeckExporter};
use crate::gateway::{Gateway, DEFAULT_CALL_TIMEOUT};
use crate::images::FallbackSelector;
use crate::layout::{FieldKind, Layout};
use crate::models::{
    FieldValue, ImageAsset, InstructionalLevel, Outline, OutlineRequest, SlideContent, SlideField, Topic,
};
use crate::prompts::{outline_prompt, slide_prompt, system_instruction};
use crate::quota::{OperationCategory, QuotaTracker, QuotaUsage};
use crate::store::{FsImageStore, ImageStore};
use crate::validation::{generate_with_repair, ContentSchema, OutlineSchema, RepairPolicy, Repaired, SlideSchema};
use futures::future::join_all;
use llm::remote::{ImagenClient, OpenAiClient, OpenAiImageClient};
use llm::{ChatProvider, ChatRequest, ImageProvider, ModelInfo};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of the full-deck workflow.
#[derive(Debug, Clone, Serialize)]
pub struct Deck {
    pub title: String,
    pub outline: Outline,
    pub slides: Vec<SlideContent>,
    pub warnings: Vec<String>,
    pub path: PathBuf,
}

/// Composes quota, gateway, repair loop and image fallback.
pub struct DeckOrchestrator {
    tracker: Arc<QuotaTracker>,
    gateway: Gateway,
    images: FallbackSelector,
    store: Arc<dyn ImageStore>,
    exporter: Arc<dyn DeckExporter>,
    repair: RepairPolicy,
}

/// Builder for [`DeckOrchestrator`].
pub struct DeckOrchestratorBuilder {
    chat: Arc<dyn ChatProvider>,
    primary: Arc<dyn ImageProvider>,
    secondary: Arc<dyn ImageProvider>,
    tracker: Option<Arc<QuotaTracker>>,
    store: Option<Arc<dyn ImageStore>>,
    exporter: Option<Arc<dyn DeckExporter>>,
    repair: RepairPolicy,
    timeout: Duration,
}

impl DeckOrchestratorBuilder {
    /// Share a tracker between orchestrators (one per process).
    pub fn tracker(mut self, tracker: Arc<QuotaTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn exporter(mut self, exporter: Arc<dyn DeckExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn repair_policy(mut self, repair: RepairPolicy) -> Self {
        self.repair = repair;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> DeckOrchestrator {
        let defaults = DeckgenConfig::default();
        let tracker = self.tracker.unwrap_or_default();
        let gateway = Gateway::new(self.chat).with_timeout(self.timeout);
        let images = FallbackSelector::new(self.primary, self.secondary, tracker.clone(), gateway.clone());

        DeckOrchestrator {
            tracker,
            gateway,
            images,
            store: self.store.unwrap_or_else(|| {
                Arc::new(FsImageStore::new(
                    defaults.images.output_dir,
                    defaults.images.public_prefix,
                ))
            }),
            exporter: self
                .exporter
                .unwrap_or_else(|| Arc::new(JsonDeckExporter::new(defaults.export.output_dir))),
            repair: self.repair,
        }
    }
}

impl DeckOrchestrator {
    pub fn builder(
        chat: Arc<dyn ChatProvider>,
        primary: Arc<dyn ImageProvider>,
        secondary: Arc<dyn ImageProvider>,
    ) -> DeckOrchestratorBuilder {
        DeckOrchestratorBuilder {
            chat,
            primary,
            secondary,
            tracker: None,
            store: None,
            exporter: None,
            repair: RepairPolicy::default(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Wire the remote providers described by `config`.
    pub fn from_config(config: &DeckgenConfig, credentials: &Credentials) -> Result<Self> {
        let timeout = config.call_timeout();
        let providers = &config.providers;

        let chat = OpenAiClient::new(providers.chat.client_config(&credentials.chat, timeout))?;
        let primary = ImagenClient::new(
            providers
                .image_primary
                .client_config(credentials.image_primary.as_deref().unwrap_or_default(), timeout),
        );
        let secondary = OpenAiImageClient::new(
            providers
                .image_secondary
                .client_config(&credentials.image_secondary, timeout),
        )?
        .with_size(&providers.image_size);

        Ok(Self::builder(Arc::new(chat), Arc::new(primary), Arc::new(secondary))
            .tracker(Arc::new(QuotaTracker::new(config.quota_policy())))
            .store(Arc::new(FsImageStore::new(
                &config.images.output_dir,
                &config.images.public_prefix,
            )))
            .exporter(Arc::new(JsonDeckExporter::new(&config.export.output_dir)))
            .repair_policy(config.repair.clone())
            .timeout(timeout)
            .build())
    }

    pub fn tracker(&self) -> &Arc<QuotaTracker> {
        &self.tracker
    }

    /// Generate at most `count` topics about `context`.
    pub async fn generate_outline(
        &self,
        context: &str,
        count: usize,
        level: InstructionalLevel,
    ) -> Result<Outline> {
        let request = OutlineRequest::new(context, count, level)?;
        let schema = OutlineSchema::new(request.count());
        let repaired = self.chat_with_repair(&schema, outline_prompt(&request)).await?;

        info!(
            topics = repaired.value.len(),
            attempts = repaired.attempts,
            warnings = repaired.warnings.len(),
            "outline generated"
        );
        Ok(Outline {
            topics: repaired.value,
            warnings: repaired.warnings,
            attempts: repaired.attempts,
        })
    }

    /// Generate the content of one slide. Image failures yield a placeholder.
    pub async fn generate_slide(
        &self,
        topic: &Topic,
        level: InstructionalLevel,
        layout: Layout,
    ) -> Result<SlideContent> {
        topic.ensure_valid()?;
        let schema = SlideSchema::new(layout);
        let draft = self
            .chat_with_repair(&schema, slide_prompt(topic, level, layout))
            .await?
            .value;

        let image = if layout.has_image() {
            let prompt = topic
                .image_prompt
                .clone()
                .or_else(|| draft.image_prompt.clone())
                .unwrap_or_else(|| format!("An educational illustration of {}", topic.title));
            Some(match self.generate_image(&prompt).await {
                Ok(asset) => asset,
                Err(err) => {
                    warn!(topic = %topic.title, error = %err, "image generation failed, using placeholder");
                    ImageAsset::placeholder()
                }
            })
        } else {
            None
        };

        let mut text_fields = draft.fields;
        let fields = layout
            .fields()
            .iter()
            .map(|spec| {
                let value = match (spec.kind, &image) {
                    (FieldKind::Image, Some(asset)) => FieldValue::Image(asset.clone()),
                    _ => text_fields
                        .iter()
                        .position(|f| f.name == spec.name)
                        .map(|i| text_fields.swap_remove(i).value)
                        .unwrap_or_else(|| FieldValue::empty(spec.kind)),
                };
                SlideField {
                    name: spec.name.to_string(),
                    value,
                }
            })
            .collect();

        let slide = SlideContent {
            title: draft.title.unwrap_or_else(|| topic.title.clone()),
            layout,
            fields,
        };
        if !slide.matches_layout() {
            return Err(DeckError::generation_failed(
                format!("assembled slide does not match layout {layout}"),
                None,
                None,
            ));
        }
        Ok(slide)
    }

    /// Generate and store one image, reporting which provider produced it.
    pub async fn generate_image(&self, prompt: &str) -> Result<ImageAsset> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DeckError::InvalidRequest("image prompt must not be empty".to_string()));
        }

        let result = self.images.generate_image(prompt).await?;
        let reference = self.store.store(&result.image).await?;
        info!(provider = %result.provider, %reference, "image ready");

        Ok(ImageAsset {
            reference,
            provenance: result.provenance,
            provider: Some(result.provider),
        })
    }

    /// Outline, then every slide concurrently, then export.
    ///
    /// Slides that fail are skipped and reported in `warnings`; the deck fails
    /// only when no slide could be generated.
    pub async fn generate_deck(
        &self,
        context: &str,
        count: usize,
        level: InstructionalLevel,
        layout: Layout,
    ) -> Result<Deck> {
        let outline = self.generate_outline(context, count, level).await?;
        let results = join_all(
            outline
                .topics
                .iter()
                .map(|topic| self.generate_slide(topic, level, layout)),
        )
        .await;

        let mut warnings = outline.warnings.clone();
        let mut slides = Vec::with_capacity(results.len());
        let mut last_error = None;
        for (topic, result) in outline.topics.iter().zip(results) {
            match result {
                Ok(slide) => slides.push(slide),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(topic = %topic.title, error = %err, "slide skipped");
                    warnings.push(format!("slide '{}' skipped: {err}", topic.title));
                    last_error = Some(err);
                }
            }
        }

        if slides.is_empty() {
            return Err(DeckError::generation_failed(
                "no slides could be generated",
                None,
                last_error.as_ref(),
            ));
        }

        let title = context.trim().to_string();
        let path = self.exporter.export(&title, &slides).await?;
        Ok(Deck {
            title,
            outline,
            slides,
            warnings,
            path,
        })
    }

    /// Models exposed by the chat provider.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let retries = self.tracker.policy().max_retries;
        self.tracker
            .await_admission(OperationCategory::ModelList, retries)
            .await?;
        self.gateway.models().await
    }

    pub fn quota_snapshot(&self) -> Vec<QuotaUsage> {
        self.tracker.snapshot()
    }

    async fn chat_with_repair<S: ContentSchema>(&self, schema: &S, prompt: String) -> Result<Repaired<S::Output>> {
        let retries = self.tracker.policy().max_retries;
        generate_with_repair(
            |escalation| {
                let request = ChatRequest::new(system_instruction(schema, escalation), prompt.clone());
                async move {
                    self.tracker
                        .await_admission(OperationCategory::Chat, retries)
                        .await?;
                    self.gateway.chat(&request).await
                }
            },
            schema,
            &self.repair,
            self.tracker.policy().backoff_delay(),
        )
        .await
    }
}

impl std::fmt::Debug for DeckOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeckOrchestrator")
            .field("gateway", &self.gateway)
            .field("images", &self.images)
            .field("repair", &self.repair)
            .finish()
    }
}
