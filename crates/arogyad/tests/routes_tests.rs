//! Route tests against an in-process router.

use arogya_common::config::{default_field_keywords, CatalogConfig};
use arogya_common::similarity::SimilarityScorer;
use arogya_common::{
    FakeSummaryLookup, FallbackResolver, FixedChooser, Intent, IntentCatalog, LookupMiss,
    RecordStore, ResolverSettings, TopicRecord, APOLOGY,
};
use arogyad::routes::{HealthResponse, ListIntentsResponse};
use arogyad::server::{app, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn router() -> Router {
    let catalog = IntentCatalog::from_intents(vec![
        Intent::new("greeting", &["hello", "hi there"], &["Hello!"]),
        Intent::new(
            "malaria_symptoms",
            &["malaria symptoms", "signs of malaria"],
            &["Malaria causes fever with chills."],
        ),
    ])
    .unwrap();
    let records = RecordStore::from_records(
        vec![TopicRecord::new(
            "Diabetes",
            &[("symptoms", "Increased thirst"), ("treatment", "Insulin")],
        )],
        CatalogConfig::default().record_fields,
        default_field_keywords(),
    )
    .unwrap();
    let lookup = FakeSummaryLookup::missing(LookupMiss::Status(404))
        .with_hit("cholera", "Cholera is an infection of the small intestine.");

    let resolver = FallbackResolver::new(
        Arc::new(catalog),
        Arc::new(records),
        SimilarityScorer::default(),
        Arc::new(lookup),
        ResolverSettings::default(),
    )
    .with_chooser(Arc::new(FixedChooser(0)));

    app(AppState::new(resolver), Duration::from_secs(5))
}

async fn post_json(path: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let body = body.to_string();
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(path: &str) -> (StatusCode, Vec<u8>) {
    let response = router()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_ask_intent() {
    let (status, body) = post_json("/v1/ask", json!({"question": "what are malaria symptoms"})).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["answer"], "Malaria causes fever with chills.");
    assert_eq!(v["stage"], "intent");
    assert_eq!(v["source"], "malaria_symptoms");
    assert!(v["score"].as_f64().unwrap() >= 70.0);
}

#[tokio::test]
async fn test_ask_record_and_external() {
    let (_, body) = post_json("/v1/ask", json!({"question": "diabetes treatment"})).await;
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["stage"], "record");
    assert_eq!(v["answer"], "Diabetes\nTreatment: Insulin");

    let (_, body) = post_json("/v1/ask", json!({"question": "cholera"})).await;
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["stage"], "external");
    assert!(v["answer"].as_str().unwrap().ends_with("(Source: Wikipedia)"));
}

#[tokio::test]
async fn test_ask_unknown_is_apology_without_score() {
    let (status, body) = post_json("/v1/ask", json!({"question": "xyzzycorp"})).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["answer"], APOLOGY);
    assert_eq!(v["stage"], "apology");
    assert!(v.get("score").is_none());
    assert!(v.get("source").is_none());
}

#[tokio::test]
async fn test_ask_rejects_missing_question() {
    let (status, _) = post_json("/v1/ask", json!({"text": "hello"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_explain_limits() {
    let (status, body) = post_json("/v1/explain", json!({"question": "signs of malaria", "top": 2})).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    let ranked = v.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["pattern_text"], "signs of malaria");
    assert!(ranked[0]["breakdown"]["lexical"].as_f64().unwrap() > 99.0);

    let (status, _) = post_json("/v1/explain", json!({"question": "malaria", "top": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json("/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.intents, 2);
    assert_eq!(health.patterns, 4);
    assert_eq!(health.records, 1);
    assert_eq!(health.encoder, "hashed-terms");
}

#[tokio::test]
async fn test_list_intents() {
    let (status, body) = get_json("/v1/intents").await;
    assert_eq!(status, StatusCode::OK);
    let list: ListIntentsResponse = serde_json::from_slice(&body).unwrap();
    let tags: Vec<&str> = list.intents.iter().map(|i| i.tag.as_str()).collect();
    assert_eq!(tags, vec!["greeting", "malaria_symptoms"]);
    assert_eq!(list.intents[0].patterns, vec!["hello", "hi there"]);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let question = "a".repeat(64 * 1024);
    let (status, _) = post_json("/v1/ask", json!({ "question": question })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
