//! reqwest client against an in-process stand-in for the analysis backend.

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anomalyscope::api::{AnomalyApi, HttpAnomalyApi};
use anomalyscope::config::ScopeConfig;
use anomalyscope::error::{DashboardError, FailureKind};
use anomalyscope::render::JsonSink;
use axum::extract::{Multipart, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

async fn upload(mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        if field.file_name().unwrap_or_default().is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "No file selected" })),
            );
        }
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": e.to_string() })),
                )
            }
        };
        if data.starts_with(b"garbage") {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "bad file" })),
            );
        }
        let rows = data
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .count()
            .saturating_sub(1);
        return (
            StatusCode::OK,
            Json(json!({ "message": "File processed successfully", "anomalies_count": rows })),
        );
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "No file uploaded" })),
    )
}

async fn anomalies() -> Json<Value> {
    Json(json!([
        {
            "user_id": "u-1001",
            "timestamp": "2024-03-09T03:12:44.120000",
            "action": "login",
            "resource": "/vpn",
            "ip_address": "203.0.113.50",
            "anomaly_type": "Outside Working Hours",
            "score": 0.08
        },
        {
            "user_id": "u-1002",
            "timestamp": "2024-03-09T03:40:00",
            "action": "download",
            "resource": "/finance/payroll.xlsx",
            "ip_address": "198.51.100.7",
            "anomaly_type": "High Access Frequency",
            "score": 0.41
        },
        {
            "user_id": "u-1001",
            "timestamp": "2024-03-10T17:05:00",
            "action": null,
            "resource": "/admin",
            "ip_address": "203.0.113.50",
            "anomaly_type": "Unusual IP/Location",
            "score": 0.77
        }
    ]))
}

async fn export(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    match params.get("format").map(String::as_str).unwrap_or("csv") {
        "csv" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv")],
            "user_id,timestamp,action,resource,ip_address,anomaly_type,score\n".to_string(),
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Format not supported" })),
        )
            .into_response(),
    }
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>Internal Server Error</html>")
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/upload", post(upload))
        .route("/anomalies", get(anomalies))
        .route("/export", get(export))
        .route("/broken/anomalies", get(broken))
        .route("/broken/upload", post(broken));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_fetch_anomalies() {
    let addr = spawn_backend().await;
    let api = HttpAnomalyApi::new(&format!("http://{}", addr), None).unwrap();

    let records = api.fetch_anomalies().await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].user_id.as_deref(), Some("u-1001"));
    assert_eq!(records[1].score, Some(0.41));
    assert_eq!(records[2].action, "");
}

#[tokio::test]
async fn test_upload_success_and_remote_error() {
    let addr = spawn_backend().await;
    let api = HttpAnomalyApi::new(&format!("http://{}", addr), None).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let good = dir.path().join("auth.csv");
    std::fs::write(
        &good,
        "UserID,Timestamp,Action,Resource,IP\n\
         u1,2024-03-09 03:00:00,login,/vpn,10.0.0.1\n\
         u2,2024-03-09 04:00:00,login,/vpn,10.0.0.2\n",
    )
    .unwrap();
    let receipt = api.upload(&good).await.unwrap();
    assert_eq!(receipt.anomalies_count, Some(2));

    let bad = dir.path().join("bad.csv");
    std::fs::write(&bad, "garbage\x00\x01").unwrap();
    let err = api.upload(&bad).await.unwrap_err();
    assert_eq!(err, DashboardError::Remote("bad file".to_string()));
}

#[tokio::test]
async fn test_upload_missing_file_is_validation_error() {
    let addr = spawn_backend().await;
    let api = HttpAnomalyApi::new(&format!("http://{}", addr), None).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let err = api.upload(&dir.path().join("nope.csv")).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Validation);
}

#[tokio::test]
async fn test_non_json_responses_are_transport_errors() {
    let addr = spawn_backend().await;
    let api = HttpAnomalyApi::new(&format!("http://{}/broken", addr), None).unwrap();

    let err = api.fetch_anomalies().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transport);

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("auth.csv");
    std::fs::write(&file, "UserID\n").unwrap();
    let err = api.upload(&file).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpAnomalyApi::new(&format!("http://{}", addr), None).unwrap();
    let err = api.fetch_anomalies().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn test_export() {
    let addr = spawn_backend().await;
    let api = HttpAnomalyApi::new(&format!("http://{}", addr), None).unwrap();

    let body = api.export("csv").await.unwrap();
    assert!(String::from_utf8(body).unwrap().starts_with("user_id,timestamp"));

    let err = api.export("xlsx").await.unwrap_err();
    assert_eq!(err, DashboardError::Remote("Format not supported".to_string()));
}

#[tokio::test]
async fn test_dashboard_against_backend() {
    let addr = spawn_backend().await;
    let mut config = ScopeConfig::default();
    config.backend.base_url = format!("http://{}", addr);

    let out = SharedBuf::default();
    let mut dashboard =
        anomalyscope::connect(&config, Box::new(JsonSink::new(out.clone()))).unwrap();

    dashboard.boot();
    dashboard.settle().await;
    assert!(!dashboard.is_loading());
    assert!(dashboard.state().last_failure().is_none());

    let bytes = out.0.lock().unwrap().clone();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(doc["summary"]["total_count"], 3);
    assert_eq!(doc["summary"]["unique_user_count"], 2);
    assert_eq!(doc["hour_histogram"][3], 2);
    assert_eq!(doc["hour_histogram"][17], 1);
    assert_eq!(doc["type_histogram"]["Outside Working Hours"], 1);
    assert_eq!(doc["records"][0]["tier"], "high");
    assert_eq!(doc["records"][1]["tier"], "medium");
    assert_eq!(doc["records"][2]["tier"], "low");
}
