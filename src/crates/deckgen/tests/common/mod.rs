//! Mock providers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use deckgen::{DeckOrchestrator, FsImageStore, JsonDeckExporter, QuotaPolicy, QuotaTracker};
use llm::{ChatProvider, ChatRequest, GeneratedImage, ImageProvider, ModelInfo, ProviderError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Chat provider that replays scripted replies and records every request.
pub struct MockChat {
    replies: Mutex<VecDeque<llm::Result<String>>>,
    /// Reply used once the script is exhausted.
    fallback: Option<String>,
    pub requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockChat {
    pub fn scripted(replies: Vec<llm::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Always answer with `reply`.
    pub fn always(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn system_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.system().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn complete(&self, request: &ChatRequest) -> llm::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Err(ProviderError::provider("mock script exhausted")),
        }
    }

    async fn list_models(&self) -> llm::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo::new("mock-chat-1"), ModelInfo::new("mock-chat-2")])
    }

    fn name(&self) -> &str {
        "mock-chat"
    }
}

/// Image provider returning a fixed result and recording each prompt.
pub struct MockImage {
    name: &'static str,
    result: llm::Result<GeneratedImage>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockImage {
    pub fn bytes(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            result: Ok(GeneratedImage::Bytes {
                data: vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a],
                mime_type: "image/png".to_string(),
            }),
            prompts: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn failing(name: &'static str, err: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            name,
            result: Err(err),
            prompts: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.prompts.lock().unwrap().len() as u32
    }

    pub fn received_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for MockImage {
    async fn generate(&self, prompt: &str) -> llm::Result<GeneratedImage> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.result.clone()
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Orchestrator wired to mocks, writing into a temporary directory.
pub struct Harness {
    pub orchestrator: DeckOrchestrator,
    pub chat: Arc<MockChat>,
    pub primary: Arc<MockImage>,
    pub secondary: Arc<MockImage>,
    pub dir: TempDir,
}

pub fn harness(chat: Arc<MockChat>, primary: Arc<MockImage>, secondary: Arc<MockImage>) -> Harness {
    harness_with_policy(chat, primary, secondary, QuotaPolicy::default())
}

pub fn harness_with_policy(
    chat: Arc<MockChat>,
    primary: Arc<MockImage>,
    secondary: Arc<MockImage>,
    policy: QuotaPolicy,
) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let orchestrator = DeckOrchestrator::builder(chat.clone(), primary.clone(), secondary.clone())
        .tracker(Arc::new(QuotaTracker::new(policy)))
        .store(Arc::new(FsImageStore::new(dir.path().join("images"), "/images")))
        .exporter(Arc::new(JsonDeckExporter::new(dir.path().join("decks"))))
        .build();

    Harness {
        orchestrator,
        chat,
        primary,
        secondary,
        dir,
    }
}

/// JSON for an outline with `n` well-formed topics.
pub fn outline_json(titles: &[&str]) -> String {
    let topics: Vec<_> = titles
        .iter()
        .map(|title| {
            serde_json::json!({
                "title": title,
                "key_points": [
                    format!("{title}: definition"),
                    format!("{title}: mechanism"),
                    format!("{title}: example"),
                ],
                "image_prompt": format!("A diagram of {title}"),
            })
        })
        .collect();
    serde_json::json!({ "topics": topics }).to_string()
}
