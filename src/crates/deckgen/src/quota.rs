//! Rolling per-minute and per-day quota tracking for provider calls.
//!
//! Each [`OperationCategory`] owns two sliding windows of request timestamps.
//! Stale timestamps are purged lazily before every admission check or usage
//! read. All window mutations for a tracker go through one mutex, which is
//! never held across an `.await`.

use crate::error::{DeckError, QuotaOrigin, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Length of the short window.
pub const MINUTE: Duration = Duration::from_secs(60);
/// Length of the long window.
pub const DAY: Duration = Duration::from_secs(86_400);

/// Category of provider operation, each with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationCategory {
    /// Chat completion (outline and slide text).
    Chat,
    /// Preferred, scarce image provider.
    ImagePrimary,
    /// Secondary image provider.
    ImageFallback,
    /// Model listing.
    ModelList,
}

impl OperationCategory {
    pub const ALL: [OperationCategory; 4] = [
        OperationCategory::Chat,
        OperationCategory::ImagePrimary,
        OperationCategory::ImageFallback,
        OperationCategory::ModelList,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationCategory::Chat => "chat",
            OperationCategory::ImagePrimary => "image-primary",
            OperationCategory::ImageFallback => "image-fallback",
            OperationCategory::ModelList => "model-list",
        }
    }
}

impl std::fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationCategory {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        OperationCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DeckError::InvalidRequest(format!("unknown operation category: {s}")))
    }
}

/// Budget for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLimits {
    /// Weighted usage ceiling for the 60s window.
    pub minute_limit: u32,
    /// Weighted usage ceiling for the 24h window.
    pub day_limit: u32,
    /// Relative cost of one request.
    #[serde(default = "default_weight")]
    pub cost_weight: u32,
    /// Deny immediately instead of backing off.
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_weight() -> u32 {
    1
}

impl CategoryLimits {
    pub fn new(minute_limit: u32, day_limit: u32) -> Self {
        Self {
            minute_limit,
            day_limit,
            cost_weight: 1,
            fail_fast: false,
        }
    }

    pub fn with_weight(mut self, cost_weight: u32) -> Self {
        self.cost_weight = cost_weight;
        self
    }

    pub fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Built-in budget for a category.
    pub fn default_for(category: OperationCategory) -> Self {
        match category {
            OperationCategory::Chat => Self::new(15, 1_500),
            OperationCategory::ImagePrimary => Self::new(10, 100).with_weight(2).fail_fast(),
            OperationCategory::ImageFallback => Self::new(10, 500),
            OperationCategory::ModelList => Self::new(30, 1_000),
        }
    }

    fn weight(&self) -> u32 {
        self.cost_weight.max(1)
    }

    /// Largest request count whose weighted usage stays strictly below `limit`.
    fn capacity(&self, limit: u32) -> u32 {
        limit.saturating_sub(1) / self.weight()
    }
}

/// Quota policy: per-category limits plus backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaPolicy {
    /// Overrides keyed by category; missing categories use built-in limits.
    pub limits: BTreeMap<OperationCategory, CategoryLimits>,
    /// Base delay for linear backoff (`attempt * backoff_delay_ms`).
    pub backoff_delay_ms: u64,
    /// Admission attempts before a non-fail-fast category gives up.
    pub max_retries: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            limits: OperationCategory::ALL
                .into_iter()
                .map(|c| (c, CategoryLimits::default_for(c)))
                .collect(),
            backoff_delay_ms: 2_000,
            max_retries: 3,
        }
    }
}

impl QuotaPolicy {
    pub fn limits_for(&self, category: OperationCategory) -> CategoryLimits {
        self.limits
            .get(&category)
            .copied()
            .unwrap_or_else(|| CategoryLimits::default_for(category))
    }

    pub fn with_limits(mut self, category: OperationCategory, limits: CategoryLimits) -> Self {
        self.limits.insert(category, limits);
        self
    }

    pub fn backoff_delay(&self) -> Duration {
        Duration::from_millis(self.backoff_delay_ms)
    }
}

/// Timestamps of admitted requests within a sliding duration.
///
/// Timestamps are kept in non-decreasing order.
#[derive(Debug, Clone)]
pub struct QuotaWindow {
    duration: Duration,
    stamps: VecDeque<Instant>,
}

impl QuotaWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            stamps: VecDeque::new(),
        }
    }

    /// Drop every timestamp at least `duration` old.
    pub fn purge(&mut self, now: Instant) {
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) >= self.duration {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Append a timestamp, clamped so ordering never goes backwards.
    pub fn push(&mut self, now: Instant) {
        let stamp = match self.stamps.back() {
            Some(&last) if last > now => last,
            _ => now,
        };
        self.stamps.push_back(stamp);
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instant> {
        self.stamps.iter()
    }

    /// Time until the oldest entry leaves the window.
    pub fn time_until_slot(&self, now: Instant) -> Option<Duration> {
        self.stamps
            .front()
            .map(|&oldest| self.duration.saturating_sub(now.saturating_duration_since(oldest)))
    }
}

#[derive(Debug)]
struct CategoryState {
    minute: QuotaWindow,
    day: QuotaWindow,
}

impl CategoryState {
    fn new() -> Self {
        Self {
            minute: QuotaWindow::new(MINUTE),
            day: QuotaWindow::new(DAY),
        }
    }

    fn purge(&mut self, now: Instant) {
        self.minute.purge(now);
        self.day.purge(now);
    }

    fn admissible(&self, limits: &CategoryLimits) -> bool {
        (self.minute.len() as u32) < limits.capacity(limits.minute_limit)
            && (self.day.len() as u32) < limits.capacity(limits.day_limit)
    }

    fn record(&mut self, now: Instant) {
        self.minute.push(now);
        self.day.push(now);
    }
}

/// Usage report for a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub category: OperationCategory,
    pub minute_requests: u32,
    pub day_requests: u32,
    /// Weighted usage (`requests * cost_weight`).
    pub minute_usage: u32,
    pub day_usage: u32,
    pub minute_limit: u32,
    pub day_limit: u32,
    /// Further requests admissible right now.
    pub remaining: u32,
    pub fail_fast: bool,
}

/// Tracks quota consumption for all categories.
#[derive(Debug)]
pub struct QuotaTracker {
    policy: QuotaPolicy,
    state: Mutex<HashMap<OperationCategory, CategoryState>>,
}

impl QuotaTracker {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Check whether one more request would fit both windows.
    pub fn admit(&self, category: OperationCategory) -> bool {
        let limits = self.policy.limits_for(category);
        let now = Instant::now();
        let mut state = self.state.lock();
        let entry = state.entry(category).or_insert_with(CategoryState::new);
        entry.purge(now);
        entry.admissible(&limits)
    }

    /// Record an attempted request.
    pub fn record(&self, category: OperationCategory) {
        let now = Instant::now();
        let mut state = self.state.lock();
        let entry = state.entry(category).or_insert_with(CategoryState::new);
        entry.purge(now);
        entry.record(now);
    }

    /// Admit and record in one critical section.
    pub fn try_acquire(&self, category: OperationCategory) -> bool {
        let limits = self.policy.limits_for(category);
        let now = Instant::now();
        let mut state = self.state.lock();
        let entry = state.entry(category).or_insert_with(CategoryState::new);
        entry.purge(now);
        if entry.admissible(&limits) {
            entry.record(now);
            true
        } else {
            false
        }
    }

    /// Wait for admission, backing off linearly between attempts.
    ///
    /// Usage is recorded as soon as admission is granted. Fail-fast categories
    /// return [`DeckError::QuotaExceeded`] on the first denial.
    pub async fn await_admission(&self, category: OperationCategory, max_retries: u32) -> Result<()> {
        let limits = self.policy.limits_for(category);
        let attempts = max_retries.max(1);

        for attempt in 1..=attempts {
            if self.try_acquire(category) {
                debug!(%category, attempt, "quota admission granted");
                return Ok(());
            }
            if limits.fail_fast {
                warn!(%category, "quota denied for fail-fast category");
                return Err(self.denied(category, true));
            }
            if attempt < attempts {
                let delay = self.policy.backoff_delay() * attempt;
                debug!(%category, attempt, delay_ms = delay.as_millis() as u64, "quota denied, backing off");
                tokio::time::sleep(delay).await;
            }
        }

        warn!(%category, attempts, "quota still exhausted after backoff");
        Err(self.denied(category, false))
    }

    fn denied(&self, category: OperationCategory, fail_fast: bool) -> DeckError {
        let usage = self.usage(category);
        DeckError::QuotaExceeded {
            category,
            origin: QuotaOrigin::Local,
            fail_fast,
            message: format!(
                "{}/{} per minute, {}/{} per day",
                usage.minute_usage, usage.minute_limit, usage.day_usage, usage.day_limit
            ),
        }
    }

    /// Current usage for a category, after purging stale entries.
    pub fn usage(&self, category: OperationCategory) -> QuotaUsage {
        let limits = self.policy.limits_for(category);
        let now = Instant::now();
        let mut state = self.state.lock();
        let entry = state.entry(category).or_insert_with(CategoryState::new);
        entry.purge(now);

        let minute_requests = entry.minute.len() as u32;
        let day_requests = entry.day.len() as u32;
        let remaining = limits
            .capacity(limits.minute_limit)
            .saturating_sub(minute_requests)
            .min(limits.capacity(limits.day_limit).saturating_sub(day_requests));

        QuotaUsage {
            category,
            minute_requests,
            day_requests,
            minute_usage: minute_requests * limits.weight(),
            day_usage: day_requests * limits.weight(),
            minute_limit: limits.minute_limit,
            day_limit: limits.day_limit,
            remaining,
            fail_fast: limits.fail_fast,
        }
    }

    /// Usage for every category.
    pub fn snapshot(&self) -> Vec<QuotaUsage> {
        OperationCategory::ALL
            .into_iter()
            .map(|c| self.usage(c))
            .collect()
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(QuotaPolicy::default())
    }
}
