//! Bounded retry loop with escalating instructions.
//!
//! The loop is a small state machine:
//!
//! ```text
//! Attempt(n) --invalid or retryable error--> Repairing(n)
//! Repairing(n) --n < total--> Attempt(n + 1)
//! Repairing(n) --n == total--> Exhausted
//! ```
//!
//! Only a schema violation raises the escalation level. The first
//! `max_attempts` levels use the full schema (standard, then strict); when
//! enabled, one more level asks for the simplified schema. Transport failures
//! re-issue the same instruction, and provider rate limits wait a linear
//! backoff before the next attempt.

use super::extract::extract_structured;
use super::schema::ContentSchema;
use super::{ValidationFailure, ValidationOutcome};
use crate::error::{DeckError, QuotaOrigin, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How insistent the instruction for an attempt should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// First attempt.
    Standard,
    /// Spell out the exact shape and allow an empty answer.
    Strict,
    /// Last resort with only the required members.
    Simplified,
}

/// Attempt budget for one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairPolicy {
    /// Attempts with the full schema.
    pub max_attempts: u32,
    /// Append one simplified-schema attempt.
    pub simplified_fallback: bool,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            simplified_fallback: true,
        }
    }
}

impl RepairPolicy {
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.max(1) + u32::from(self.simplified_fallback)
    }

    /// Escalation for the 1-based level `n` (one plus the schema violations so far).
    pub fn escalation_for(&self, n: u32) -> Escalation {
        if n > self.max_attempts.max(1) {
            Escalation::Simplified
        } else if n == 1 {
            Escalation::Standard
        } else {
            Escalation::Strict
        }
    }
}

/// State of the repair loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairState {
    Attempt(u32),
    Repairing(u32),
    Exhausted,
}

impl RepairState {
    /// Transition after a failed attempt or a finished repair step.
    pub fn next(self, total: u32) -> RepairState {
        match self {
            RepairState::Attempt(n) => RepairState::Repairing(n),
            RepairState::Repairing(n) if n < total => RepairState::Attempt(n + 1),
            RepairState::Repairing(_) | RepairState::Exhausted => RepairState::Exhausted,
        }
    }
}

/// Successful outcome of the repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired<T> {
    pub value: T,
    pub warnings: Vec<String>,
    /// Provider calls made, including the successful one.
    pub attempts: u32,
}

impl<T> Repaired<T> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Parse and validate one raw response.
pub fn validate_and_repair<S: ContentSchema>(raw: &str, schema: &S) -> ValidationOutcome<S::Output> {
    let value = extract_structured(raw)?;
    schema
        .validate(&value)
        .map_err(|reason| ValidationFailure::schema(reason, raw))
}

/// Drive `make_request` until its output validates against `schema`.
///
/// `make_request` performs the provider call for the given escalation.
/// Fatal errors (authentication, invalid request, fail-fast quota) are
/// returned immediately; every other failure consumes one attempt. After the
/// n-th attempt hits a provider rate limit the loop sleeps `n * backoff`.
pub async fn generate_with_repair<S, F, Fut>(
    mut make_request: F,
    schema: &S,
    policy: &RepairPolicy,
    backoff: Duration,
) -> Result<Repaired<S::Output>>
where
    S: ContentSchema,
    F: FnMut(Escalation) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let total = policy.total_attempts();
    let mut state = RepairState::Attempt(1);
    let mut level = 1;
    let mut last_raw: Option<String> = None;
    let mut last_error: Option<DeckError> = None;

    loop {
        match state {
            RepairState::Attempt(n) => {
                let escalation = policy.escalation_for(level);
                debug!(schema = schema.name(), attempt = n, ?escalation, "requesting content");

                match make_request(escalation).await {
                    Ok(raw) => match validate_and_repair(&raw, schema) {
                        Ok(validated) => {
                            info!(schema = schema.name(), attempts = n, "content validated");
                            return Ok(Repaired {
                                value: validated.value,
                                warnings: validated.warnings,
                                attempts: n,
                            });
                        }
                        Err(failure) => {
                            warn!(schema = schema.name(), attempt = n, reason = %failure.reason, "response failed validation");
                            last_raw = Some(raw);
                            last_error = Some(failure.into());
                            level += 1;
                        }
                    },
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!(schema = schema.name(), attempt = n, error = %err, "provider call failed");
                        if is_provider_rate_limit(&err) && n < total {
                            let delay = backoff * n;
                            debug!(attempt = n, ?delay, "provider rate limited, backing off");
                            tokio::time::sleep(delay).await;
                        }
                        last_error = Some(err);
                    }
                }
                state = state.next(total);
            }
            RepairState::Repairing(_) => state = state.next(total),
            RepairState::Exhausted => {
                let reason = match &last_error {
                    Some(err) => format!("no valid content generated after {total} attempts: {err}"),
                    None => format!("no valid content generated after {total} attempts"),
                };
                warn!(schema = schema.name(), "{reason}");
                return Err(DeckError::generation_failed(reason, last_raw, last_error.as_ref()));
            }
        }
    }
}

fn is_provider_rate_limit(err: &DeckError) -> bool {
    matches!(
        err,
        DeckError::QuotaExceeded {
            origin: QuotaOrigin::Provider,
            fail_fast: false,
            ..
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::schema::OutlineSchema;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    const GOOD: &str = r#"{"topics": [{"title": "Light", "key_points": ["a", "b", "c"]}]}"#;

    /// Replays canned results and records the escalation of each call.
    struct Script {
        replies: Mutex<VecDeque<Result<String>>>,
        seen: Mutex<Vec<Escalation>>,
    }

    impl Script {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        async fn call(self: Arc<Self>, escalation: Escalation) -> Result<String> {
            self.seen.lock().push(escalation);
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok("still nothing".to_string()))
        }
    }

    #[test]
    fn test_state_machine_transitions() {
        assert_eq!(RepairState::Attempt(1).next(3), RepairState::Repairing(1));
        assert_eq!(RepairState::Repairing(1).next(3), RepairState::Attempt(2));
        assert_eq!(RepairState::Repairing(3).next(3), RepairState::Exhausted);
        assert_eq!(RepairState::Exhausted.next(3), RepairState::Exhausted);
    }

    #[test]
    fn test_policy_escalation_schedule() {
        let policy = RepairPolicy::default();
        assert_eq!(policy.total_attempts(), 3);
        assert_eq!(policy.escalation_for(1), Escalation::Standard);
        assert_eq!(policy.escalation_for(2), Escalation::Strict);
        assert_eq!(policy.escalation_for(3), Escalation::Simplified);
    }

    #[test]
    fn test_validate_well_formed_response() {
        let validated = validate_and_repair(GOOD, &OutlineSchema::new(3)).unwrap();
        assert_eq!(validated.value.len(), 1);
        assert!(validated.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_first_attempt_success_has_no_retries() {
        let script = Script::new(vec![Ok(GOOD.to_string())]);
        let s = script.clone();
        let repaired = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &RepairPolicy::default(),
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(repaired.attempts, 1);
        assert_eq!(repaired.retries(), 0);
        assert_eq!(*script.seen.lock(), vec![Escalation::Standard]);
    }

    #[tokio::test]
    async fn test_escalates_after_schema_violation() {
        let script = Script::new(vec![
            Ok("Sorry, here are some ideas about light.".to_string()),
            Ok(GOOD.to_string()),
        ]);
        let s = script.clone();
        let repaired = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &RepairPolicy::default(),
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(repaired.attempts, 2);
        assert_eq!(
            *script.seen.lock(),
            vec![Escalation::Standard, Escalation::Strict]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_raw_response() {
        let script = Script::new(vec![
            Ok("nope".to_string()),
            Err(DeckError::TransientProviderError("timeout".to_string())),
            Ok(r#"{"topics": []}"#.to_string()),
        ]);
        let s = script.clone();
        let err = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &RepairPolicy::default(),
            Duration::ZERO,
        )
        .await
        .unwrap_err();

        match err {
            DeckError::GenerationFailed {
                reason,
                last_raw,
                recommendations,
            } => {
                assert!(reason.contains("no valid content generated"));
                assert_eq!(last_raw.as_deref(), Some(r#"{"topics": []}"#));
                assert!(!recommendations.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        // The transient failure keeps the strict instruction.
        assert_eq!(
            *script.seen.lock(),
            vec![Escalation::Standard, Escalation::Strict, Escalation::Strict]
        );
    }

    #[tokio::test]
    async fn test_repeated_violations_reach_simplified() {
        let script = Script::new(vec![]);
        let s = script.clone();
        let result = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &RepairPolicy::default(),
            Duration::ZERO,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(
            *script.seen.lock(),
            vec![Escalation::Standard, Escalation::Strict, Escalation::Simplified]
        );
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_escalation() {
        let script = Script::new(vec![
            Err(DeckError::TransientProviderError("timeout".to_string())),
            Ok(GOOD.to_string()),
        ]);
        let s = script.clone();
        let repaired = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &RepairPolicy::default(),
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(repaired.attempts, 2);
        assert_eq!(
            *script.seen.lock(),
            vec![Escalation::Standard, Escalation::Standard]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_rate_limit_backs_off_linearly() {
        let limited = || DeckError::QuotaExceeded {
            category: crate::quota::OperationCategory::Chat,
            origin: QuotaOrigin::Provider,
            fail_fast: false,
            message: "429".to_string(),
        };
        let script = Script::new(vec![Err(limited()), Err(limited()), Ok(GOOD.to_string())]);
        let s = script.clone();
        let start = tokio::time::Instant::now();
        let repaired = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &RepairPolicy::default(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(repaired.attempts, 3);
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(
            *script.seen.lock(),
            vec![Escalation::Standard, Escalation::Standard, Escalation::Standard]
        );
    }

    #[tokio::test]
    async fn test_authentication_failure_is_not_retried() {
        let script = Script::new(vec![Err(DeckError::AuthenticationFailure("401".to_string()))]);
        let s = script.clone();
        let err = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &RepairPolicy::default(),
            Duration::ZERO,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeckError::AuthenticationFailure(_)));
        assert_eq!(script.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_without_simplified_fallback() {
        let script = Script::new(vec![]);
        let s = script.clone();
        let policy = RepairPolicy {
            max_attempts: 2,
            simplified_fallback: false,
        };
        let result = generate_with_repair(
            move |e| s.clone().call(e),
            &OutlineSchema::new(3),
            &policy,
            Duration::ZERO,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(script.seen.lock().len(), 2);
    }
}
