mod common;

use common::{harness, outline_json, MockChat, MockImage};
use deckgen::{CategoryLimits, DeckError, InstructionalLevel, OperationCategory, QuotaOrigin, QuotaPolicy};
use llm::ProviderError;

fn images() -> (std::sync::Arc<MockImage>, std::sync::Arc<MockImage>) {
    (MockImage::bytes("primary"), MockImage::bytes("secondary"))
}

#[tokio::test]
async fn test_photosynthesis_outline_first_attempt() {
    let (primary, secondary) = images();
    let chat = MockChat::scripted(vec![Ok(outline_json(&[
        "Light-dependent reactions",
        "Calvin cycle",
        "Factors affecting photosynthesis",
    ]))]);
    let h = harness(chat, primary, secondary);

    let outline = h
        .orchestrator
        .generate_outline("Photosynthesis", 3, InstructionalLevel::HighSchool)
        .await
        .unwrap();

    assert_eq!(outline.topics.len(), 3);
    assert!(outline.warnings.is_empty());
    assert_eq!(outline.attempts, 1);
    assert_eq!(h.chat.call_count(), 1);
    assert_eq!(outline.topics[1].title, "Calvin cycle");
    assert_eq!(
        outline.topics[0].image_prompt.as_deref(),
        Some("A diagram of Light-dependent reactions")
    );
}

#[tokio::test]
async fn test_fenced_response_with_prose_is_accepted() {
    let (primary, secondary) = images();
    let reply = format!(
        "Here is your outline:\n\n```json\n{}\n```\n\nLet me know if you need more.",
        outline_json(&["Evaporation", "Condensation"])
    );
    let h = harness(MockChat::scripted(vec![Ok(reply)]), primary, secondary);

    let outline = h
        .orchestrator
        .generate_outline("The water cycle", 2, InstructionalLevel::Elementary)
        .await
        .unwrap();
    assert_eq!(outline.topics.len(), 2);
}

#[tokio::test]
async fn test_never_more_topics_than_requested() {
    let (primary, secondary) = images();
    let chat = MockChat::scripted(vec![Ok(outline_json(&["a", "b", "c", "d"]))]);
    let h = harness(chat, primary, secondary);

    let outline = h
        .orchestrator
        .generate_outline("Cells", 2, InstructionalLevel::MiddleSchool)
        .await
        .unwrap();
    assert_eq!(outline.topics.len(), 2);
    assert_eq!(outline.warnings.len(), 1);
}

#[tokio::test]
async fn test_malformed_topic_dropped_with_warning() {
    let (primary, secondary) = images();
    let reply = serde_json::json!([
        {"title": "Mitosis", "key_points": ["Prophase", "Metaphase", "Anaphase"]},
        {"title": "Meiosis", "key_points": ["Two divisions", "Four cells"]},
    ])
    .to_string();
    let h = harness(MockChat::scripted(vec![Ok(reply)]), primary, secondary);

    let outline = h
        .orchestrator
        .generate_outline("Cell division", 2, InstructionalLevel::HighSchool)
        .await
        .unwrap();
    assert_eq!(outline.topics.len(), 1);
    assert_eq!(outline.topics[0].title, "Mitosis");
    assert_eq!(outline.warnings.len(), 1);
}

#[tokio::test]
async fn test_repair_escalates_then_succeeds() {
    let (primary, secondary) = images();
    let chat = MockChat::scripted(vec![
        Ok("I'd be happy to help! Photosynthesis is fascinating.".to_string()),
        Err(ProviderError::Transient("connection reset".to_string())),
        Ok(outline_json(&["Chlorophyll"])),
    ]);
    let h = harness(chat, primary, secondary);

    let outline = h
        .orchestrator
        .generate_outline("Photosynthesis", 1, InstructionalLevel::University)
        .await
        .unwrap();

    assert_eq!(outline.attempts, 3);
    let prompts = h.chat.system_prompts();
    assert_eq!(prompts.len(), 3);
    assert!(!prompts[0].contains(r#"{"topics": []}"#));
    assert!(prompts[1].contains(r#"{"topics": []}"#));
    // A transport failure re-sends the same instruction.
    assert_eq!(prompts[2], prompts[1]);
}

#[tokio::test]
async fn test_transient_failure_resends_same_instruction() {
    let (primary, secondary) = images();
    let chat = MockChat::scripted(vec![
        Err(ProviderError::Transient("connection reset".to_string())),
        Ok(outline_json(&["Chlorophyll"])),
    ]);
    let h = harness(chat, primary, secondary);

    let outline = h
        .orchestrator
        .generate_outline("Photosynthesis", 1, InstructionalLevel::University)
        .await
        .unwrap();

    assert_eq!(outline.attempts, 2);
    let prompts = h.chat.system_prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
    assert!(!prompts[1].contains("could not be used"));
}

#[tokio::test(start_paused = true)]
async fn test_provider_rate_limit_waits_before_retrying() {
    let (primary, secondary) = images();
    let chat = MockChat::scripted(vec![
        Err(ProviderError::RateLimited("429".to_string())),
        Err(ProviderError::RateLimited("429".to_string())),
        Ok(outline_json(&["Chlorophyll"])),
    ]);
    let policy = QuotaPolicy {
        backoff_delay_ms: 500,
        ..QuotaPolicy::default()
    };
    let h = common::harness_with_policy(chat, primary, secondary, policy);

    let start = tokio::time::Instant::now();
    let outline = h
        .orchestrator
        .generate_outline("Photosynthesis", 1, InstructionalLevel::University)
        .await
        .unwrap();

    assert_eq!(outline.attempts, 3);
    // 500ms after the first 429, 1s after the second.
    assert!(start.elapsed() >= std::time::Duration::from_millis(1_500));
}

#[tokio::test]
async fn test_exhausted_repair_reports_last_raw() {
    let (primary, secondary) = images();
    let h = harness(MockChat::always(r#"{"topics": []}"#), primary, secondary);

    let err = h
        .orchestrator
        .generate_outline("Photosynthesis", 3, InstructionalLevel::HighSchool)
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
            assert!(recommendations.iter().any(|r| r.contains("different topic")));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(h.chat.call_count(), 3);
}

#[tokio::test]
async fn test_authentication_failure_not_retried() {
    let (primary, secondary) = images();
    let chat = MockChat::scripted(vec![Err(ProviderError::Authentication("invalid api key".to_string()))]);
    let h = harness(chat, primary, secondary);

    let err = h
        .orchestrator
        .generate_outline("Photosynthesis", 3, InstructionalLevel::HighSchool)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::AuthenticationFailure(_)));
    assert_eq!(h.chat.call_count(), 1);
}

#[tokio::test]
async fn test_invalid_requests_make_no_calls() {
    let (primary, secondary) = images();
    let h = harness(MockChat::always(outline_json(&["x"])), primary, secondary);

    for (context, count) in [("", 3), ("Photosynthesis", 0), ("Photosynthesis", 21)] {
        let err = h
            .orchestrator
            .generate_outline(context, count, InstructionalLevel::HighSchool)
            .await
            .unwrap_err();
        assert!(matches!(err, DeckError::InvalidRequest(_)));
    }
    assert_eq!(h.chat.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_local_quota_denial_consumes_attempts_without_calls() {
    let (primary, secondary) = images();
    let policy = QuotaPolicy {
        backoff_delay_ms: 10,
        max_retries: 1,
        ..QuotaPolicy::default()
    }
    .with_limits(OperationCategory::Chat, CategoryLimits::new(2, 100));
    let h = common::harness_with_policy(MockChat::always("not json"), primary, secondary, policy);

    let err = h
        .orchestrator
        .generate_outline("Photosynthesis", 3, InstructionalLevel::HighSchool)
        .await
        .unwrap_err();

    // Capacity is one call per minute; later attempts are denied locally.
    assert_eq!(h.chat.call_count(), 1);
    match err {
        DeckError::GenerationFailed { reason, .. } => assert!(reason.contains("Quota exceeded")),
        other => panic!("unexpected {other:?}"),
    }
    let usage = h.orchestrator.quota_snapshot();
    let chat = usage.iter().find(|u| u.category == OperationCategory::Chat).unwrap();
    assert_eq!(chat.minute_requests, 1);
    assert_eq!(chat.remaining, 0);
}

#[tokio::test(start_paused = true)]
async fn test_provider_rate_limit_is_quota_exceeded() {
    let (primary, secondary) = images();
    let limited = MockChat::scripted(vec![
        Err(ProviderError::RateLimited("429".to_string())),
        Err(ProviderError::RateLimited("429".to_string())),
        Err(ProviderError::RateLimited("429".to_string())),
    ]);
    let h = harness(limited, primary, secondary);

    let err = h
        .orchestrator
        .generate_outline("Photosynthesis", 3, InstructionalLevel::HighSchool)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::GenerationFailed { .. }));
    assert_eq!(h.chat.call_count(), 3);
    assert!(err
        .to_string()
        .contains(&format!("({})", QuotaOrigin::Provider)));
}

#[tokio::test]
async fn test_list_models_counts_against_model_list_quota() {
    let (primary, secondary) = images();
    let h = harness(MockChat::always("unused"), primary, secondary);

    let models = h.orchestrator.list_models().await.unwrap();
    assert_eq!(models.len(), 2);

    let snapshot = h.orchestrator.quota_snapshot();
    let list = snapshot
        .iter()
        .find(|u| u.category == OperationCategory::ModelList)
        .unwrap();
    assert_eq!(list.minute_requests, 1);
}
