// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use mapscout::application::use_cases::job_service::JobService;
use mapscout::config::settings::CheckpointScope;
use mapscout::presentation::routes::routes;

use super::helpers::{
    build_service, decode, memory_service, memory_service_with, test_settings,
    FailingCheckpointBackend, StubExtractor,
};

fn server(service: Arc<JobService>) -> TestServer {
    TestServer::new(routes(service)).unwrap()
}

async fn poll_until_terminal(server: &TestServer, task_id: &str) -> Value {
    for _ in 0..500 {
        let body: Value = server
            .get(&format!("/api/task_status/{}", task_id))
            .await
            .json();
        let status = body["status"].as_str().unwrap_or_default().to_string();
        if matches!(status.as_str(), "completed" | "failed" | "stopped") {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} did not finish", task_id);
}

async fn start(server: &TestServer, body: Value) -> String {
    let response = server.post("/api/start_scraping").json(&body).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Scraping task started in background");
    body["task_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_version() {
    let server = server(memory_service(Arc::new(StubExtractor::new(1))));

    let health = server.get("/health").await;
    health.assert_status_ok();
    health.assert_text("OK");

    server
        .get("/version")
        .await
        .assert_text(env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_start_poll_and_download() {
    let server = server(memory_service(Arc::new(StubExtractor::new(3))));

    let task_id = start(
        &server,
        json!({ "task_type": "search", "query": "tacos in Austin", "max_results": 3, "delay_ms": 0 }),
    )
    .await;

    let status = poll_until_terminal(&server, &task_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["task_id"], task_id.as_str());
    assert_eq!(status["total_results"], 3);
    assert_eq!(status["progress"], 1.0);

    let download = server
        .get(&format!("/api/download_results/{}", task_id))
        .await;
    download.assert_status_ok();
    assert_eq!(download.header("content-type"), "text/csv; charset=utf-8");
    let disposition = download.header("content-disposition");
    let disposition = disposition.to_str().unwrap();
    let expected = format!("maps_scraped_{}.csv", &task_id.replace('-', "")[..8]);
    assert!(disposition.contains(&expected), "{}", disposition);
    assert_eq!(decode(download.as_bytes()).len(), 3);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let server = server(memory_service(Arc::new(StubExtractor::new(1))));
    let unknown = uuid::Uuid::new_v4().to_string();

    for path in [
        format!("/api/task_status/{}", unknown),
        format!("/api/download_results/{}", unknown),
        "/api/task_status/not-a-uuid".to_string(),
    ] {
        let response = server.get(&path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("Task not found"));
    }

    server
        .post(&format!("/api/stop_task/{}", unknown))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_before_results_is_conflict() {
    let mut settings = test_settings(CheckpointScope::Shared);
    settings.concurrency.max_sessions = 1;
    let extractor = StubExtractor::new(50).with_item_delay(Duration::from_millis(50));
    let server = server(memory_service_with(Arc::new(extractor), &settings));

    let request = json!({ "task_type": "search", "query": "pho", "max_results": 50, "delay_ms": 0 });
    let busy = start(&server, request.clone()).await;
    let queued = start(&server, request).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let response = server
        .get(&format!("/api/download_results/{}", queued))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["task_status"]["status"], "pending");

    for id in [&queued, &busy] {
        server
            .post(&format!("/api/stop_task/{}", id))
            .await
            .assert_json(&json!({ "success": true }));
    }
    assert_eq!(poll_until_terminal(&server, &queued).await["status"], "stopped");
    assert_eq!(poll_until_terminal(&server, &busy).await["status"], "stopped");
}

#[tokio::test]
async fn test_invalid_request_is_accepted_then_fails() {
    let server = server(memory_service(Arc::new(StubExtractor::new(1))));

    let task_id = start(&server, json!({ "task_type": "search", "max_results": 5 })).await;
    let status = poll_until_terminal(&server, &task_id).await;

    assert_eq!(status["status"], "failed");
    assert!(status["message"].as_str().unwrap().starts_with("Error: "));
    server
        .get(&format!("/api/download_results/{}", task_id))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_active_tasks_lists_submissions() {
    let server = server(memory_service(Arc::new(StubExtractor::new(1))));

    let first = start(&server, json!({ "task_type": "search", "query": "a", "delay_ms": 0 })).await;
    let second = start(&server, json!({ "task_type": "search", "query": "b", "delay_ms": 0 })).await;
    poll_until_terminal(&server, &first).await;
    poll_until_terminal(&server, &second).await;

    let body: Value = server.get("/api/active_tasks").await.json();
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    let ids: Vec<&str> = tasks.iter().filter_map(|t| t["task_id"].as_str()).collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[tokio::test]
async fn test_checkpoint_preview_and_clear() {
    let server = server(memory_service(Arc::new(StubExtractor::new(2))));

    let empty: Value = server.get("/api/get_checkpoint").await.json();
    assert_eq!(empty["success"], true);
    assert_eq!(empty["total_rows"], 0);
    assert_eq!(empty["message"], "No checkpoint data found");

    let task_id = start(
        &server,
        json!({ "task_type": "poi", "keywords": ["cafe"], "location": "Austin", "delay_ms": 0 }),
    )
    .await;
    poll_until_terminal(&server, &task_id).await;

    let preview: Value = server.get("/api/get_checkpoint").await.json();
    assert_eq!(preview["total_rows"], 2);
    assert_eq!(preview["data"].as_array().unwrap().len(), 2);
    assert_eq!(preview["data"][0]["probe"], "cafe");
    assert_eq!(preview["file"], "memory://checkpoint_results");

    server
        .post("/api/clear_checkpoint")
        .await
        .assert_json(&json!({ "success": true }));
    let cleared: Value = server.get("/api/get_checkpoint").await.json();
    assert_eq!(cleared["total_rows"], 0);
}

#[tokio::test]
async fn test_download_after_failed_writes_is_conflict_not_server_error() {
    let service = build_service(
        Arc::new(StubExtractor::new(2)),
        Arc::new(FailingCheckpointBackend::all_writes()),
        &test_settings(CheckpointScope::Shared),
    );
    let server = server(service);

    let task_id = start(
        &server,
        json!({ "task_type": "search", "query": "ramen", "max_results": 2, "delay_ms": 0 }),
    )
    .await;
    let status = poll_until_terminal(&server, &task_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["total_results"], 2);

    let response = server
        .get(&format!("/api/download_results/{}", task_id))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["task_status"]["status"], "completed");
}
