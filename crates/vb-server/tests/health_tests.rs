// SPDX-License-Identifier: MIT OR Apache-2.0
//! Health, metadata, and rule-pack listing endpoint tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use vb_server::{build_app, AppState};

fn test_config(tmp: &std::path::Path) -> vb_config::VbConfig {
    vb_config::VbConfig {
        rule_packs_dir: tmp.join("rule_packs").display().to_string(),
        packages_dir: tmp.join("packages").display().to_string(),
        ..Default::default()
    }
}

async fn test_state(tmp: &std::path::Path) -> Arc<AppState> {
    std::fs::create_dir_all(tmp.join("rule_packs")).unwrap();
    std::fs::create_dir_all(tmp.join("packages")).unwrap();
    Arc::new(AppState::new(test_config(tmp)).unwrap())
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_reports_ok_without_llm_configured() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let (status, json) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["llm"], "disabled");
}

#[tokio::test]
async fn ping_returns_pong() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let resp = app
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn meta_parsers_lists_required_ingest_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let (status, json) = get_json(app, "/api/meta/parsers").await;
    assert_eq!(status, StatusCode::OK);
    let fields = json["required_fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f == "airline"));
    assert!(fields.iter().any(|f| f == "file"));
}

#[tokio::test]
async fn meta_version_reports_pipeline_and_api_version() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let (status, json) = get_json(app, "/api/meta/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["api_version"], "v1.0");
    assert!(json["pipeline_version"].as_str().is_some());
}

#[tokio::test]
async fn rule_packs_empty_dir_returns_empty_list() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let (status, json) = get_json(app, "/api/rule-packs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_rule_pack_returns_404() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/rule-packs/UAL/2025-09")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
