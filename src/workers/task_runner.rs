// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::dto::job_request::JobRequestDto;
use crate::config::settings::{CheckpointScope, Settings};
use crate::domain::models::job::{ExtractionDepth, JobConfig, SearchTarget};
use crate::domain::models::record::Record;
use crate::domain::models::task::{DomainError, TaskStatus};
use crate::domain::repositories::checkpoint_repository::{CheckpointBackend, CheckpointRepository};
use crate::engines::traits::{CollectRequest, ExtractError, ExtractEvent, Extractor};
use crate::infrastructure::metrics;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::text::truncate;
use crate::workers::scrape_task::ScrapeTask;

const MAX_MESSAGE_CHARS: usize = 200;

/// 任务执行错误
#[derive(Error, Debug)]
pub enum TaskError {
    /// 任务配置无效
    #[error("{0}")]
    Config(#[from] DomainError),
    /// 执行过程中发生 panic
    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// 任务执行器
///
/// 驱动提取器、维护进度并写检查点。所有任务共用同一个执行器，
/// 通过信号量限制同时持有提取器会话的任务数。
pub struct TaskRunner {
    extractor: Arc<dyn Extractor>,
    backend: Arc<dyn CheckpointBackend>,
    scope: CheckpointScope,
    batch_size: usize,
    results_dir: String,
    shared_key: String,
    retry: RetryPolicy,
    sessions: Arc<Semaphore>,
}

impl TaskRunner {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        backend: Arc<dyn CheckpointBackend>,
        settings: &Settings,
    ) -> Self {
        Self {
            extractor,
            backend,
            scope: settings.checkpoint.scope,
            batch_size: settings.checkpoint.batch_size.max(1),
            results_dir: settings.storage.results_dir.clone(),
            shared_key: settings.storage.checkpoint_file.clone(),
            retry: RetryPolicy::from(&settings.retry),
            sessions: Arc::new(Semaphore::new(settings.concurrency.max_sessions.max(1))),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 任务结果在检查点后端中的键
    pub fn results_key(&self, task_id: Uuid) -> String {
        let name = format!("results_{}", task_id);
        if self.results_dir.is_empty() {
            name
        } else {
            format!("{}/{}", self.results_dir.trim_end_matches('/'), name)
        }
    }

    pub fn store(&self, key: &str) -> Arc<dyn CheckpointRepository> {
        self.backend.open(key)
    }

    pub fn artifact_store(&self, task_id: Uuid) -> Arc<dyn CheckpointRepository> {
        self.store(&self.results_key(task_id))
    }

    /// 所有任务共用的检查点
    pub fn shared_store(&self) -> Arc<dyn CheckpointRepository> {
        self.backend.open(&self.shared_key)
    }

    pub fn create_task(&self, task_id: Uuid, request: JobRequestDto) -> Arc<ScrapeTask> {
        let key = self.results_key(task_id);
        let location = self.backend.open(&key).location();
        Arc::new(ScrapeTask::new(task_id, request, key, location))
    }

    /// 执行任务直到进入终态
    ///
    /// 不返回错误：配置错误和 panic 会让任务进入 failed。
    /// 终态下总会尝试写出结果文件，写入失败只记录日志；
    /// `total_results` 始终是最终去重后的记录数，并与终态一起写入快照
    #[instrument(skip(self, task), fields(task_id = %task.id()))]
    pub async fn run(&self, task: Arc<ScrapeTask>) {
        let _permit = tokio::select! {
            biased;
            _ = task.cancel_token().cancelled() => None,
            permit = self.sessions.clone().acquire_owned() => permit.ok(),
        };

        if let Err(e) = task.update(|s| s.start()) {
            warn!("Task cannot start: {}", e);
            return;
        }
        info!("Task started with {} extractor", self.extractor.name());

        let mut sink = RecordSink::new(
            self.backend.open(task.results_key()),
            match self.scope {
                CheckpointScope::Shared => Some(self.shared_store()),
                CheckpointScope::PerTask => None,
            },
            self.batch_size,
        );
        let mut config = None;

        let outcome = AssertUnwindSafe(self.execute(&task, &mut config, &mut sink))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));

        sink.flush().await;
        let records = match &config {
            Some(config) => config.finalize(sink.take_records()),
            None => sink.take_records(),
        };
        sink.write_artifact(&records).await;
        let total = records.len();

        let (status, message) = match outcome {
            Ok(()) if task.is_stop_requested() => {
                (TaskStatus::Stopped, "Task stopped by user".to_string())
            }
            Ok(()) => (
                TaskStatus::Completed,
                format!("Task completed with {} results", total),
            ),
            Err(e) => {
                error!("Task failed: {}", e);
                (
                    TaskStatus::Failed,
                    truncate(&format!("Error: {}", e), MAX_MESSAGE_CHARS),
                )
            }
        };

        let progress = if status == TaskStatus::Completed { 1.0 } else { 0.0 };
        if let Err(e) = task.update(|s| {
            s.transition(status).map(|next| {
                let mut next = next.advance(progress, message.clone());
                next.total_results = total;
                next
            })
        }) {
            warn!("Task could not finish: {}", e);
            return;
        }
        metrics::task_finished(status);
        info!("Task {} with {} results", status, total);
    }

    async fn execute(
        &self,
        task: &ScrapeTask,
        config_slot: &mut Option<JobConfig>,
        sink: &mut RecordSink,
    ) -> Result<(), TaskError> {
        let config = JobConfig::try_from(task.request())?;
        let targets = config.targets()?;
        *config_slot = Some(config.clone());

        info!(
            "Running {} job with {} target(s), cap {}",
            config.kind,
            targets.len(),
            config.result_cap
        );

        let slice = 1.0 / targets.len().max(1) as f64;
        for (index, target) in targets.iter().enumerate() {
            if task.is_stop_requested() {
                return Ok(());
            }
            if index > 0 && !config.pacing.is_zero() {
                tokio::select! {
                    _ = task.cancel_token().cancelled() => return Ok(()),
                    _ = tokio::time::sleep(config.pacing) => {}
                }
            }

            let base = index as f64 * slice;
            task.advance(
                base,
                format!("Searching {} ({}/{})", target.label, index + 1, targets.len()),
            );

            self.run_target(task, &config, target, base, slice, sink).await;
            sink.flush().await;
            task.advance(base + slice, format!("Finished {}", target.label));
        }
        Ok(())
    }

    async fn run_target(
        &self,
        task: &ScrapeTask,
        config: &JobConfig,
        target: &SearchTarget,
        base: f64,
        slice: f64,
        sink: &mut RecordSink,
    ) {
        let probe = target.probe.clone().unwrap_or_default();
        let request = CollectRequest {
            target: target.clone(),
            result_cap: config.result_cap,
            pacing: config.pacing,
            depth: config.depth,
            cancel: task.cancel_token().clone(),
        };

        let mut events = match self.open_with_retry(&request).await {
            Ok(Some(events)) => events,
            Ok(None) => return,
            Err(e) => {
                warn!("Giving up on {}: {}", target.label, e);
                let detail = truncate(&format!("{}: {}", target.label, e), MAX_MESSAGE_CHARS);
                sink.push(Record::failure(e.placeholder_status(), &probe, detail))
                    .await;
                return;
            }
        };

        let cap = config.result_cap.max(1);
        let mut taken = 0usize;
        let mut planned_links: Option<usize> = None;

        while taken < cap {
            if task.is_stop_requested() {
                break;
            }
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                ExtractEvent::LinksCollected(count) => {
                    planned_links = Some(count.min(cap));
                    task.advance(
                        base + slice * 0.5,
                        format!("Collected {} links for {}", count, target.label),
                    );
                }
                ExtractEvent::Record(record) => {
                    taken += 1;
                    sink.push(record.tagged(&probe)).await;

                    let fraction = match (config.depth, planned_links) {
                        (ExtractionDepth::Detailed, Some(planned)) => {
                            0.5 + 0.5 * taken as f64 / planned.max(1) as f64
                        }
                        _ => taken as f64 / cap as f64,
                    };
                    task.advance(
                        base + slice * fraction.min(1.0),
                        format!("Extracted {} of {} from {}", taken, cap, target.label),
                    );
                }
            }
        }
        metrics::records_extracted(taken);
        debug!("{} record(s) from {}", taken, target.label);
    }

    /// 打开目标，失败时按策略退避重试
    ///
    /// 取消时返回 `Ok(None)`
    async fn open_with_retry(
        &self,
        request: &CollectRequest,
    ) -> Result<Option<BoxStream<'static, ExtractEvent>>, ExtractError> {
        let mut attempt = 0u32;
        loop {
            match self.extractor.collect(request).await {
                Ok(events) => return Ok(Some(events)),
                Err(ExtractError::Cancelled) => return Ok(None),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || !self.retry.should_retry(attempt) {
                        return Err(e);
                    }

                    let backoff = self.retry.calculate_backoff(attempt);
                    metrics::navigation_retry();
                    warn!(
                        "Attempt {} on {} failed: {}. Retrying in {:?}",
                        attempt, request.target.label, e, backoff
                    );
                    tokio::select! {
                        _ = request.cancel.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 任务内的记录累积器
///
/// 每累计 `batch_size` 条写一次检查点。检查点写入失败只记录日志，不影响任务。
struct RecordSink {
    artifact: Arc<dyn CheckpointRepository>,
    shared: Option<Arc<dyn CheckpointRepository>>,
    batch_size: usize,
    records: Vec<Record>,
    pending: usize,
}

impl RecordSink {
    fn new(
        artifact: Arc<dyn CheckpointRepository>,
        shared: Option<Arc<dyn CheckpointRepository>>,
        batch_size: usize,
    ) -> Self {
        Self {
            artifact,
            shared,
            batch_size,
            records: Vec::new(),
            pending: 0,
        }
    }

    async fn push(&mut self, record: Record) {
        self.records.push(record);
        self.pending += 1;
        if self.pending >= self.batch_size {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        if self.pending == 0 {
            return;
        }
        let batch = &self.records[self.records.len() - self.pending..];

        match self.artifact.save(batch).await {
            Ok(total) => {
                metrics::checkpoint_written();
                debug!("Checkpointed {} record(s), {} stored", batch.len(), total);
            }
            Err(e) => {
                metrics::checkpoint_failure();
                warn!("Checkpoint save to {} failed: {}", self.artifact.location(), e);
            }
        }
        if let Some(shared) = &self.shared {
            match shared.save(batch).await {
                Ok(_) => metrics::checkpoint_written(),
                Err(e) => {
                    metrics::checkpoint_failure();
                    warn!("Checkpoint save to {} failed: {}", shared.location(), e);
                }
            }
        }
        self.pending = 0;
    }

    fn take_records(&mut self) -> Vec<Record> {
        self.pending = 0;
        std::mem::take(&mut self.records)
    }

    /// 写出最终结果，失败只记录日志
    async fn write_artifact(&self, records: &[Record]) {
        match self.artifact.replace(records).await {
            Ok(()) => metrics::checkpoint_written(),
            Err(e) => {
                metrics::checkpoint_failure();
                warn!("Writing final results to {} failed: {}", self.artifact.location(), e);
            }
        }
    }
}
