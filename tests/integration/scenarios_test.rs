// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashSet;
use std::sync::Arc;

use mapscout::domain::models::record::RecordStatus;
use mapscout::domain::models::task::TaskStatus;
use mapscout::engines::traits::ExtractError;

use super::helpers::{
    decode, memory_service, radius_scan, single_query, wait_for_terminal, StubExtractor,
};

#[tokio::test]
async fn test_single_query_collects_capped_results() {
    let service = memory_service(Arc::new(StubExtractor::new(5)));

    let task_id = service.submit(single_query(5));
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.total_results, 5);
    assert_eq!(snapshot.progress, 1.0);
    assert_eq!(snapshot.message, "Task completed with 5 results");

    let artifact = service.result(task_id).await.unwrap();
    assert_eq!(decode(&artifact.bytes).len(), 5);
}

#[tokio::test]
async fn test_result_cap_limits_records_per_target() {
    let service = memory_service(Arc::new(StubExtractor::new(12)));

    let task_id = service.submit(single_query(4));
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.total_results, 4);
}

#[tokio::test]
async fn test_duplicate_links_collapse_keeping_last_seen() {
    let service = memory_service(Arc::new(StubExtractor::new(5).with_duplicates(2)));

    let task_id = service.submit(single_query(5));
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.total_results, 3);

    let records = decode(&service.result(task_id).await.unwrap().bytes);
    let links: HashSet<&str> = records.iter().map(|r| r.source_link.as_str()).collect();
    assert_eq!(links.len(), 3);
    // 链接 0 和 1 被第 3、4 条覆盖
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"coffee in Austin #3"));
    assert!(names.contains(&"coffee in Austin #4"));
    assert!(!names.contains(&"coffee in Austin #0"));
}

#[tokio::test]
async fn test_radius_scan_tags_records_with_probe() {
    let service = memory_service(Arc::new(StubExtractor::new(2)));

    let task_id = service.submit(radius_scan(&["cafe", "dentist", "gym"], 10));
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.total_results, 6);

    let records = decode(&service.result(task_id).await.unwrap().bytes);
    for probe in ["cafe", "dentist", "gym"] {
        let tagged: Vec<_> = records.iter().filter(|r| r.probe == probe).collect();
        assert_eq!(tagged.len(), 2, "probe {}", probe);
        assert!(tagged.iter().all(|r| r.name.starts_with(probe)));
    }
}

#[tokio::test]
async fn test_stop_before_running_ends_stopped() {
    let service = memory_service(Arc::new(StubExtractor::new(5)));

    let task_id = service.submit(single_query(5));
    service.stop(task_id).unwrap();
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Stopped);
    assert_eq!(snapshot.message, "Task stopped by user");
    // 经过了 running
    assert!(snapshot.started_at.is_some());
    assert_ne!(snapshot.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_failing_target_leaves_placeholder_and_task_completes() {
    let extractor = Arc::new(
        StubExtractor::new(2)
            .failing_probe("dentist", ExtractError::Navigation("net::ERR_ABORTED".to_string())),
    );
    let service = memory_service(extractor.clone());

    let task_id = service.submit(radius_scan(&["cafe", "dentist", "gym"], 10));
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.total_results, 5);

    let records = decode(&service.result(task_id).await.unwrap().bytes);
    let failed: Vec<_> = records.iter().filter(|r| r.probe == "dentist").collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, RecordStatus::Error);
    assert!(failed[0].source_link.is_empty());
    assert!(failed[0]
        .status_detail
        .as_deref()
        .unwrap_or_default()
        .contains("ERR_ABORTED"));

    let ok = records.iter().filter(|r| r.status == RecordStatus::Ok).count();
    assert_eq!(ok, 4);
    // 2 个正常目标各 1 次，失败目标用满 3 次
    assert_eq!(extractor.calls(), 5);
}

#[tokio::test]
async fn test_timeout_placeholder_status() {
    let extractor = Arc::new(
        StubExtractor::new(2).failing_probe("gym", ExtractError::Timeout("gym".to_string())),
    );
    let service = memory_service(extractor);

    let task_id = service.submit(radius_scan(&["gym"], 10));
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    let records = decode(&service.result(task_id).await.unwrap().bytes);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Timeout);
}

#[tokio::test]
async fn test_navigation_recovers_within_retry_budget() {
    let extractor = Arc::new(StubExtractor::new(3).failing_first(2));
    let service = memory_service(extractor.clone());

    let task_id = service.submit(single_query(3));
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.total_results, 3);
    assert_eq!(extractor.calls(), 3);
}

#[tokio::test]
async fn test_radius_scan_keeps_first_record_across_probes() {
    // 不同探测命中同一链接时保留最先出现者
    let service = memory_service(Arc::new(StubExtractor::new(2)));

    let mut request = radius_scan(&["cafe", "cafe"], 10);
    request.location = Some("Austin".to_string());
    let task_id = service.submit(request);
    let snapshot = wait_for_terminal(&service, task_id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.total_results, 2);
}
