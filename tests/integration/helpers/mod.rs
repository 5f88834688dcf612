// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod failing_backend;
pub mod stub_extractor;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mapscout::application::dto::job_request::JobRequestDto;
use mapscout::application::use_cases::job_service::JobService;
use mapscout::config::settings::{CheckpointScope, Settings};
use mapscout::domain::models::task::TaskSnapshot;
use mapscout::domain::repositories::checkpoint_repository::CheckpointBackend;
use mapscout::engines::traits::Extractor;
use mapscout::infrastructure::checkpoint::{CsvFileBackend, InMemoryCheckpointBackend};
use mapscout::queue::task_registry::TaskRegistry;
use mapscout::utils::retry_policy::RetryPolicy;
use mapscout::workers::task_runner::TaskRunner;
use uuid::Uuid;

pub use failing_backend::FailingCheckpointBackend;
pub use stub_extractor::StubExtractor;

pub fn test_settings(scope: CheckpointScope) -> Settings {
    let mut settings = Settings::defaults().expect("default settings");
    settings.checkpoint.scope = scope;
    settings.checkpoint.batch_size = 2;
    settings.concurrency.max_sessions = 2;
    settings
}

pub fn build_service(
    extractor: Arc<dyn Extractor>,
    backend: Arc<dyn CheckpointBackend>,
    settings: &Settings,
) -> Arc<JobService> {
    let runner = TaskRunner::new(extractor, backend, settings)
        .with_retry_policy(RetryPolicy::immediate(settings.retry.max_attempts));
    Arc::new(JobService::new(
        Arc::new(TaskRegistry::new()),
        Arc::new(runner),
    ))
}

/// 内存后端上的服务
pub fn memory_service(extractor: Arc<dyn Extractor>) -> Arc<JobService> {
    memory_service_with(extractor, &test_settings(CheckpointScope::Shared))
}

pub fn memory_service_with(extractor: Arc<dyn Extractor>, settings: &Settings) -> Arc<JobService> {
    build_service(
        extractor,
        Arc::new(InMemoryCheckpointBackend::new()),
        settings,
    )
}

/// CSV 文件后端上的服务
pub fn local_service(extractor: Arc<dyn Extractor>, dir: &Path, scope: CheckpointScope) -> Arc<JobService> {
    build_service(
        extractor,
        Arc::new(CsvFileBackend::new(dir)),
        &test_settings(scope),
    )
}

pub fn single_query(cap: usize) -> JobRequestDto {
    JobRequestDto {
        task_type: Some("single-query".to_string()),
        query: Some("coffee in Austin".to_string()),
        max_results: Some(cap),
        delay_ms: Some(0),
        ..Default::default()
    }
}

pub fn radius_scan(keywords: &[&str], cap: usize) -> JobRequestDto {
    JobRequestDto {
        task_type: Some("radius-scan".to_string()),
        keywords: Some(keywords.iter().map(|k| k.to_string()).collect()),
        location: Some("Austin, TX".to_string()),
        max_results: Some(cap),
        delay_ms: Some(0),
        ..Default::default()
    }
}

/// 等待任务进入终态
pub async fn wait_for_terminal(service: &JobService, task_id: Uuid) -> TaskSnapshot {
    wait_until(service, task_id, |s| s.status.is_terminal()).await
}

pub async fn wait_until<F>(service: &JobService, task_id: Uuid, predicate: F) -> TaskSnapshot
where
    F: FnMut(&TaskSnapshot) -> bool,
{
    let task = service.registry().get(task_id).expect("task is registered");
    let mut rx = task.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(10), rx.wait_for(predicate))
        .await
        .expect("task did not reach the expected state in time")
        .expect("status channel closed")
        .clone();
    snapshot
}

/// 解析下载得到的结果文件
pub fn decode(bytes: &[u8]) -> Vec<mapscout::domain::models::record::Record> {
    mapscout::infrastructure::checkpoint::csv_codec::decode(bytes).expect("valid results file")
}
