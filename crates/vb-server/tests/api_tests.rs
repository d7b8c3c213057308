// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end walk of the pipeline endpoints: ingest, optimize, strategy,
//! generate layers, lint.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use vb_server::{build_app, AppState};

const CSV_FIXTURE: &[u8] = b"pairing_id,days,credit_minutes,block_minutes,routing,dates,includes_weekend,has_red_eye,equipment\nPR1,3,600,540,DEN;ORD;DEN,,false,false,737\nPR2,2,420,360,DEN;SFO;DEN,,true,false,737\n";

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

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

fn multipart_body(boundary: &str, fields: &[(&str, &str)], file: (&str, &[u8])) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in fields {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    out.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
            file.0
        )
        .as_bytes(),
    );
    out.extend_from_slice(file.1);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    out
}

async fn ingest_fixture(app: axum::Router) -> serde_json::Value {
    let boundary = "vectorbid-test-boundary";
    let body = multipart_body(
        boundary,
        &[
            ("airline", "UAL"),
            ("month", "2025-09"),
            ("base", "DEN"),
            ("fleet", "737"),
            ("seat", "FO"),
        ],
        ("pairings.csv", CSV_FIXTURE),
    );

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ingest")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

fn ctx_json() -> serde_json::Value {
    serde_json::json!({
        "ctx_id": "ctx-1",
        "pilot_id": "P1",
        "airline": "UAL",
        "month": "2025-09",
        "base": "DEN",
        "seat": "FO",
        "equip": ["737"],
        "seniority_percentile": 0.5,
        "commuting_profile": {"home_airport": null, "max_commute_minutes": null},
        "default_weights": {}
    })
}

fn preferences_json() -> serde_json::Value {
    serde_json::json!({
        "pilot_id": "P1",
        "airline": "UAL",
        "base": "DEN",
        "seat": "FO",
        "equip": ["737"],
        "hard_constraints": {
            "days_off": [],
            "no_red_eyes": true,
            "legalities": []
        },
        "soft_prefs": {},
        "weights_version": "v1",
        "confidence": 0.8,
        "source": {"persona": null, "text": "", "parser_method": "rule_based", "unrecognized": []}
    })
}

#[tokio::test]
async fn ingest_then_optimize_falls_back_to_legacy_mode_without_rule_pack() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path()).await;

    let ingested = ingest_fixture(build_app(state.clone())).await;
    let package_id = ingested["package_id"].as_str().unwrap().to_string();

    let resp = build_app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/optimize")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({
                        "feature_bundle": {
                            "ctx": ctx_json(),
                            "preferences": preferences_json(),
                            "package_id": package_id,
                        },
                        "k": 5,
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["legacy_mode"], true);
    assert!(json["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w == "rule_pack_missing"));
    assert!(!json["candidates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn optimize_unknown_package_returns_404() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/optimize")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({
                        "feature_bundle": {
                            "ctx": ctx_json(),
                            "preferences": preferences_json(),
                            "package_id": "deadbeef",
                        },
                        "k": 5,
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_pipeline_optimize_strategy_generate_layers_lint() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path()).await;

    let ingested = ingest_fixture(build_app(state.clone())).await;
    let package_id = ingested["package_id"].as_str().unwrap().to_string();

    let feature_bundle = serde_json::json!({
        "ctx": ctx_json(),
        "preferences": preferences_json(),
        "package_id": package_id,
    });

    let optimize_resp = build_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/optimize")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(
                        &serde_json::json!({"feature_bundle": feature_bundle, "k": 3}),
                    )
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(optimize_resp.status(), StatusCode::OK);
    let optimize_json = body_json(optimize_resp).await;
    let candidates = optimize_json["candidates"].clone();

    let strategy_resp = build_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/strategy")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({
                        "feature_bundle": feature_bundle,
                        "candidates": candidates,
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(strategy_resp.status(), StatusCode::OK);
    let strategy_json = body_json(strategy_resp).await;
    let directives = strategy_json["directives"].clone();

    let layers_resp = build_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/generate_layers")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({
                        "feature_bundle": feature_bundle,
                        "candidates": candidates,
                        "directives": directives,
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(layers_resp.status(), StatusCode::OK);
    let layers_json = body_json(layers_resp).await;
    let artifact = layers_json["artifact"].clone();
    assert_eq!(artifact["airline"], "UAL");
    assert_eq!(artifact["month"], "2025-09");

    let lint_resp = build_app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/lint")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({"artifact": artifact})).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(lint_resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn export_without_signing_secret_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(test_state(tmp.path()).await);

    let artifact = serde_json::json!({
        "airline": "UAL",
        "format": "PBS2",
        "month": "2025-09",
        "layers": [],
    });

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/export")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({
                        "artifact": artifact,
                        "ctx_id": "ctx-1",
                        "pilot_id": "P1",
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(resp.status(), StatusCode::OK);
}
