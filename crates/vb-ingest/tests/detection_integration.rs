// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for ingesting realistic bid-package uploads end to end.

use vb_core::{Seat, SourceFormat};
use vb_ingest::{IngestRequest, PackageStore};

fn request() -> IngestRequest {
    IngestRequest {
        airline: "UAL".into(),
        month: "2025-09".into(),
        base: "DEN".into(),
        fleet: "737".into(),
        seat: Seat::Fo,
        filename: None,
    }
}

#[tokio::test]
async fn csv_upload_is_ingested_and_looked_up() {
    let dir = tempfile::tempdir().unwrap();
    let store = PackageStore::new(dir.path());
    let csv = b"pairing_id,days,credit_minutes,block_minutes,routing,dates,includes_weekend,has_red_eye,equipment\n\
PR100,3,600,540,DEN;ORD;DEN,2025-09-05;2025-09-06;2025-09-07,true,false,737\n\
PR101,2,400,360,DEN;LAX,2025-09-10;2025-09-11,false,true,737\n";

    let package = store
        .ingest(csv, IngestRequest { filename: Some("sep.csv".into()), ..request() })
        .await
        .unwrap();

    assert_eq!(package.source_format, SourceFormat::Csv);
    assert_eq!(package.pairings.len(), 2);
    assert!(package.pairings.iter().any(|p| p.has_red_eye));

    let looked_up = store.lookup(&package.package_id).await.unwrap();
    assert_eq!(looked_up.package_id, package.package_id);
}

#[tokio::test]
async fn jsonl_upload_round_trips_pairings_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let store = PackageStore::new(dir.path());
    let line = serde_json::json!({
        "pairing_id": "PR200",
        "days": 4,
        "credit_minutes": 900,
        "block_minutes": 820,
        "routing": ["DEN", "EWR", "LHR", "DEN"],
        "dates": ["2025-09-12", "2025-09-13", "2025-09-14", "2025-09-15"],
        "includes_weekend": false,
        "has_red_eye": true,
        "duty_periods": [],
        "layovers": [{"airport": "LHR", "minutes": 1440}],
        "equipment": "787",
        "raw": ""
    });
    let bytes = format!("{line}\n");

    let package = store
        .ingest(bytes.as_bytes(), IngestRequest { filename: Some("sep.jsonl".into()), ..request() })
        .await
        .unwrap();

    assert_eq!(package.source_format, SourceFormat::Jsonl);
    assert_eq!(package.pairings[0].pairing_id, "PR200");
    assert_eq!(package.pairings[0].layovers[0].airport, "LHR");
}

#[tokio::test]
async fn unrecognizable_bytes_are_rejected_without_a_partial_package() {
    let dir = tempfile::tempdir().unwrap();
    let store = PackageStore::new(dir.path());
    let bytes = [0xFFu8, 0xFE, 0x00, 0x01, 0x02];

    let result = store.ingest(&bytes, request()).await;
    assert!(result.is_err());
}
