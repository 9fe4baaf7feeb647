// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete memory pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite stores and mock
//! adapters. Tests are independent and order-insensitive.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tessera_core::TesseraError;
use tessera_memory::{
    Contradiction, ContradictionDetector, EngineConfig, EpisodeType, Fact, FactNetwork, Metadata,
    Operation, RecallOptions, RememberOptions, StatementMeta,
};
use tessera_test_utils::{FailingEmbedder, ScriptedExtractor, TestHarness};
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

fn world_fact_response(statement: &str) -> String {
    json!({ "facts": [{ "network": "world_fact", "statement": statement, "confidence": 0.95 }] })
        .to_string()
}

/// Detector that never flags anything, counting how often it was asked.
#[derive(Default)]
struct NeverDetector {
    calls: AtomicUsize,
}

impl ContradictionDetector for NeverDetector {
    fn detect(
        &self,
        _existing: &str,
        _incoming: &str,
        _existing_meta: Option<&StatementMeta>,
        _incoming_meta: Option<&StatementMeta>,
    ) -> Result<Option<Contradiction>, TesseraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

// ---- Test 1: Raw text without an extractor ----

#[tokio::test]
async fn test_remember_without_extractor_stores_raw_text() {
    let harness = TestHarness::builder().build().await.unwrap();

    for (i, text) in ["hello", "", "The sky is blue", "ünïcödé ✓"].iter().enumerate() {
        let result = harness.engine.remember(text, None).await.unwrap();
        assert_eq!(result.operation, Operation::Add);
        assert!(result.facts.is_empty());
        assert!(result.contradiction.is_none());
        assert_eq!(harness.engine.count().await.unwrap(), i + 1);

        let item = harness
            .vector_store
            .get(&result.vector_store_id)
            .await
            .unwrap()
            .expect("item stored");
        assert_eq!(item.text, *text);
    }
}

#[tokio::test]
async fn test_write_id_format_and_vector_id_match() {
    let harness = TestHarness::builder().build().await.unwrap();
    let result = harness.engine.remember("anything", None).await.unwrap();

    let parts: Vec<&str> = result.id.split('_').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "mem");
    assert!(parts[1].parse::<u64>().is_ok());
    assert_eq!(parts[2].len(), 9);
    assert_eq!(result.vector_store_id, result.id);
}

#[tokio::test]
async fn test_caller_metadata_is_kept_alongside_bookkeeping() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), json!("chat"));

    let result = harness
        .engine
        .remember("Paris is in France", Some(metadata))
        .await
        .unwrap();
    let item = harness
        .vector_store
        .get(&result.vector_store_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.metadata["source"], json!("chat"));
    assert_eq!(item.metadata["writeId"], json!(result.id));
    assert_eq!(item.metadata["operation"], json!("ADD"));
    assert_eq!(item.metadata["factCount"], json!(0));
}

// ---- Test 2: Extraction failure is silent ----

#[tokio::test]
#[traced_test]
async fn test_extraction_failure_degrades_to_raw_text() {
    let harness = TestHarness::builder()
        .with_graph_store()
        .with_failing_extractor()
        .with_heuristic_detector()
        .build()
        .await
        .unwrap();

    let result = harness
        .engine
        .remember("The timeout is 30 seconds", None)
        .await
        .unwrap();
    assert!(result.facts.is_empty());
    assert_eq!(result.operation, Operation::Add);
    assert!(result.graph_store_id.is_none());
    assert_eq!(harness.engine.count().await.unwrap(), 1);
    assert!(logs_contain("fact extraction failed"));
}

#[tokio::test]
async fn test_unparseable_model_output_degrades_to_raw_text() {
    let harness = TestHarness::builder()
        .with_extractor_responses(vec!["Sorry, I cannot help with that.".into()])
        .build()
        .await
        .unwrap();

    let result = harness.engine.remember("Rust is fast", None).await.unwrap();
    assert!(result.facts.is_empty());
    assert_eq!(harness.engine.count().await.unwrap(), 1);
    assert_eq!(harness.mock_provider.request_count().await, 1);
}

// ---- Test 3: Dual write ----

#[tokio::test]
async fn test_dual_write_creates_one_episode_with_all_entities() {
    let text = "Alice moved the billing service to Kubernetes";
    let extractor = ScriptedExtractor::new().on(
        text,
        vec![
            Fact::new(FactNetwork::Experience, "Alice moved billing to Kubernetes")
                .with_entity("Alice", "person")
                .with_entity("billing service", "service")
                .with_relationship("billing service", "runs_on", "Kubernetes"),
            Fact::new(FactNetwork::EntitySummary, "Kubernetes hosts billing")
                .with_entity("Kubernetes", "platform")
                .with_entity("Alice", "person"),
        ],
    );
    let harness = TestHarness::builder()
        .with_graph_store()
        .with_extractor(Arc::new(extractor))
        .build()
        .await
        .unwrap();
    let graph = harness.graph_store.clone().unwrap();

    let result = harness.engine.remember(text, None).await.unwrap();

    assert_eq!(harness.engine.count().await.unwrap(), 1);
    assert_eq!(graph.episode_count().await.unwrap(), 1);
    let episode_id = result.graph_store_id.expect("episode written");
    assert_eq!(episode_id, result.id);

    let linked: BTreeSet<String> = graph
        .episode_entities(&episode_id)
        .await
        .unwrap()
        .into_iter()
        .collect();
    let expected: BTreeSet<String> = result
        .facts
        .iter()
        .flat_map(|f| f.entities.iter().map(|e| e.name.clone()))
        .collect();
    assert_eq!(linked, expected);
}

#[tokio::test]
async fn test_no_facts_means_no_episode() {
    let harness = TestHarness::builder()
        .with_graph_store()
        .with_extractor_responses(vec![r#"{"facts": []}"#.into()])
        .build()
        .await
        .unwrap();

    let result = harness.engine.remember("hmm", None).await.unwrap();
    assert!(result.graph_store_id.is_none());
    assert_eq!(harness.graph_store.unwrap().episode_count().await.unwrap(), 0);
}

// ---- Test 4: Contradiction means UPDATE ----

#[tokio::test]
async fn test_contradiction_returns_update_with_verbatim_statements() {
    let harness = TestHarness::builder()
        .with_graph_store()
        .with_extractor_responses(vec![
            world_fact_response("Port 8080 serves the API"),
            world_fact_response("Port 9090 serves the API"),
        ])
        .with_heuristic_detector()
        .build()
        .await
        .unwrap();

    let first = harness
        .engine
        .remember("Port 8080 serves the API", None)
        .await
        .unwrap();
    let second = harness
        .engine
        .remember("Port 9090 serves the API", None)
        .await
        .unwrap();

    assert_eq!(second.operation, Operation::Update);
    let contradiction = second.contradiction.expect("contradiction reported");
    assert_eq!(contradiction.existing_fact.statement, "Port 8080 serves the API");
    assert_eq!(contradiction.new_fact.statement, "Port 9090 serves the API");
    assert_eq!(contradiction.existing_fact.id.as_deref(), Some(first.id.as_str()));

    let stored = harness.graph_store.unwrap().contradictions().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, contradiction.id);
}

// ---- Test 5: No false contradictions ----

#[tokio::test]
async fn test_unrelated_facts_are_added() {
    let detector = Arc::new(NeverDetector::default());
    let harness = TestHarness::builder()
        .with_extractor_responses(vec![
            world_fact_response("The office is in Berlin"),
            world_fact_response("The office is in Munich"),
        ])
        .with_detector(detector.clone())
        .with_config(EngineConfig {
            similarity_threshold: 0.0,
            ..EngineConfig::default()
        })
        .build()
        .await
        .unwrap();

    harness
        .engine
        .remember("The office is in Berlin", None)
        .await
        .unwrap();
    let result = harness
        .engine
        .remember("The office is in Munich", None)
        .await
        .unwrap();

    assert_eq!(result.operation, Operation::Add);
    assert!(result.contradiction.is_none());
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_experiences_are_never_checked() {
    let detector = Arc::new(NeverDetector::default());
    let harness = TestHarness::builder()
        .with_extractor_responses(vec![
            json!({ "facts": [{ "network": "experience", "statement": "Ran the migration" }] })
                .to_string(),
            json!({ "facts": [{ "network": "experience", "statement": "Ran the migration" }] })
                .to_string(),
        ])
        .with_detector(detector.clone())
        .build()
        .await
        .unwrap();

    harness.engine.remember("Ran the migration", None).await.unwrap();
    harness.engine.remember("Ran the migration", None).await.unwrap();
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
}

// ---- Test 6: Forget ----

#[tokio::test]
async fn test_forget_known_and_unknown_ids() {
    let harness = TestHarness::builder().build().await.unwrap();
    let a = harness.engine.remember("first", None).await.unwrap();
    harness.engine.remember("second", None).await.unwrap();
    assert_eq!(harness.engine.count().await.unwrap(), 2);

    assert!(harness.engine.forget(&a.vector_store_id).await.unwrap());
    assert_eq!(harness.engine.count().await.unwrap(), 1);

    assert!(!harness.engine.forget(&a.vector_store_id).await.unwrap());
    assert!(!harness.engine.forget("mem_0_nosuchitem").await.unwrap());
    assert_eq!(harness.engine.count().await.unwrap(), 1);
}

// ---- Test 7: Recall ordering ----

#[tokio::test]
async fn test_recall_respects_top_k_threshold_and_order() {
    let harness = TestHarness::builder().build().await.unwrap();
    for text in [
        "the build pipeline runs nightly",
        "the build pipeline runs hourly on weekdays",
        "the build broke",
        "lunch is at noon",
        "the cat sleeps",
    ] {
        harness.engine.remember(text, None).await.unwrap();
    }

    let threshold = 0.3;
    let results = harness
        .engine
        .recall(
            "the build pipeline runs nightly",
            RecallOptions {
                top_k: Some(2),
                threshold: Some(threshold),
            },
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].item.text, "the build pipeline runs nightly");
    assert!((results[0].score - 1.0).abs() < 1e-4);
    assert!(results.iter().all(|r| r.score >= threshold));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_recall_uses_engine_defaults() {
    let harness = TestHarness::builder()
        .with_config(EngineConfig {
            top_k: 1,
            similarity_threshold: 0.0,
            query_limit: 10,
        })
        .build()
        .await
        .unwrap();
    harness.engine.remember("alpha beta", None).await.unwrap();
    harness.engine.remember("alpha gamma", None).await.unwrap();

    let results = harness
        .engine
        .recall("alpha", RecallOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

// ---- Test 8: Scenario: timeout change ----

#[tokio::test]
async fn test_timeout_change_is_flagged_and_both_items_kept() {
    let harness = TestHarness::builder()
        .with_extractor_responses(vec![
            world_fact_response("The timeout is 30 seconds"),
            world_fact_response("The timeout is 60 seconds"),
        ])
        .with_heuristic_detector()
        .build()
        .await
        .unwrap();

    let first = harness
        .engine
        .remember("The timeout is 30 seconds", None)
        .await
        .unwrap();
    assert_eq!(first.operation, Operation::Add);

    let second = harness
        .engine
        .remember("The timeout is 60 seconds", None)
        .await
        .unwrap();
    assert_eq!(second.operation, Operation::Update);
    let contradiction = second.contradiction.unwrap();
    assert!(contradiction.existing_fact.statement.contains("30 seconds"));
    assert!(contradiction.new_fact.statement.contains("60 seconds"));
    assert_eq!(harness.engine.count().await.unwrap(), 2);

    let wire = serde_json::to_value(&contradiction).unwrap();
    assert!(wire.get("existingFact").is_some());
    assert!(wire.get("newFact").is_some());
}

// ---- Test 9: Scenario: deployment knowledge query ----

#[tokio::test]
async fn test_deployment_experience_is_queryable() {
    let harness = TestHarness::builder()
        .with_graph_store()
        .with_extractor_responses(vec![json!({
            "facts": [{
                "network": "experience",
                "statement": "Deployed v2.0 to production",
                "entities": [{ "name": "v2.0", "type": "release" }]
            }]
        })
        .to_string()])
        .build()
        .await
        .unwrap();

    harness
        .engine
        .remember("Deployed v2.0 to production", None)
        .await
        .unwrap();

    let records = harness
        .engine
        .query_knowledge("deployed", None)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].summary.contains("Deployed v2.0 to production"));
    assert_eq!(records[0].episode_type, EpisodeType::Action);
    assert_eq!(records[0].entities, vec!["v2.0".to_string()]);
}

#[tokio::test]
async fn test_query_knowledge_without_graph_is_empty() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.engine.remember("Deployed v2.0", None).await.unwrap();
    assert!(harness
        .engine
        .query_knowledge("deployed", Some(5))
        .await
        .unwrap()
        .is_empty());
}

// ---- Test 10: Failure modes ----

#[tokio::test]
async fn test_embedding_failure_fails_the_call() {
    let harness = TestHarness::builder()
        .with_embedder(Arc::new(FailingEmbedder))
        .build()
        .await
        .unwrap();

    let err = harness.engine.remember("anything", None).await.unwrap_err();
    assert!(err.is_embedding(), "unexpected error: {err}");
    assert_eq!(harness.engine.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancelled_write_stores_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness
        .engine
        .remember_with_cancel("anything", None, RememberOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::Cancelled));
    assert_eq!(harness.engine.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_health_reports_each_collaborator() {
    let harness = TestHarness::builder()
        .with_graph_store()
        .with_failing_extractor()
        .build()
        .await
        .unwrap();

    let health = harness.engine.health().await;
    assert!(health.graph_store.is_some());
    assert!(health.extractor.is_some());
    assert!(!health.is_healthy());
}

#[tokio::test]
async fn test_concurrent_writes_all_land() {
    let harness = TestHarness::builder()
        .with_graph_store()
        .with_extractor(Arc::new(
            ScriptedExtractor::new()
                .on("a", vec![Fact::new(FactNetwork::Belief, "a is good")])
                .on("b", vec![Fact::new(FactNetwork::WorldFact, "b is true")]),
        ))
        .build()
        .await
        .unwrap();

    let (a, b, c) = tokio::join!(
        harness.engine.remember("a", None),
        harness.engine.remember("b", None),
        harness.engine.remember("c", None),
    );
    let ids: BTreeSet<String> = [a.unwrap().id, b.unwrap().id, c.unwrap().id]
        .into_iter()
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(harness.engine.count().await.unwrap(), 3);
    assert_eq!(
        harness.graph_store.unwrap().episode_count().await.unwrap(),
        2
    );
}
