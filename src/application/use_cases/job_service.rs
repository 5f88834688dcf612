// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::dto::job_request::JobRequestDto;
use crate::application::dto::task_status::CheckpointPreviewDto;
use crate::domain::models::task::TaskSnapshot;
use crate::domain::repositories::checkpoint_repository::CheckpointError;
use crate::infrastructure::metrics;
use crate::queue::task_registry::TaskRegistry;
use crate::workers::task_runner::TaskRunner;

pub const PREVIEW_ROWS: usize = 100;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Task not found: {0}")]
    NotFound(String),
    #[error("Results not available yet. Task may still be running or failed.")]
    NotReady(Box<TaskSnapshot>),
    #[error("Storage error: {0}")]
    Storage(#[from] CheckpointError),
}

/// 可下载的结果文件
#[derive(Debug, Clone)]
pub struct ResultArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 任务提交、查询、停止和结果获取
pub struct JobService {
    registry: Arc<TaskRegistry>,
    runner: Arc<TaskRunner>,
}

impl JobService {
    pub fn new(registry: Arc<TaskRegistry>, runner: Arc<TaskRunner>) -> Self {
        Self { registry, runner }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// 登记任务并在独立的 tokio 任务中执行，立即返回任务 id
    pub fn submit(&self, request: JobRequestDto) -> Uuid {
        let task_id = Uuid::new_v4();
        let task = self.runner.create_task(task_id, request);
        self.registry.add(task.clone());
        metrics::task_submitted();

        let runner = self.runner.clone();
        tokio::spawn(async move {
            runner.run(task).await;
        });

        info!(%task_id, "Scraping task submitted");
        task_id
    }

    pub fn status(&self, task_id: Uuid) -> Result<TaskSnapshot, JobError> {
        self.registry
            .get(task_id)
            .map(|task| task.snapshot())
            .ok_or_else(|| JobError::NotFound(task_id.to_string()))
    }

    /// 请求停止，已结束的任务同样返回成功
    pub fn stop(&self, task_id: Uuid) -> Result<(), JobError> {
        if self.registry.request_stop(task_id) {
            info!(%task_id, "Stop requested");
            Ok(())
        } else {
            Err(JobError::NotFound(task_id.to_string()))
        }
    }

    /// 获取结果文件
    ///
    /// 先查任务记录的位置，再查按 id 推导的位置，任务被清理后仍能下载
    pub async fn result(&self, task_id: Uuid) -> Result<ResultArtifact, JobError> {
        let task = self.registry.get(task_id);

        let mut keys = Vec::with_capacity(2);
        if let Some(task) = &task {
            keys.push(task.results_key().to_string());
        }
        let derived = self.runner.results_key(task_id);
        if !keys.contains(&derived) {
            keys.push(derived);
        }

        for key in keys {
            if let Some(bytes) = self.runner.store(&key).read_bytes().await? {
                return Ok(ResultArtifact {
                    filename: download_name(task_id),
                    bytes,
                });
            }
        }

        match task {
            Some(task) => Err(JobError::NotReady(Box::new(task.snapshot()))),
            None => Err(JobError::NotFound(task_id.to_string())),
        }
    }

    /// 所有已登记任务的状态，按开始时间排序
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<TaskSnapshot> = self
            .registry
            .snapshot()
            .values()
            .map(|task| task.snapshot())
            .collect();
        snapshots.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        snapshots
    }

    /// 共享检查点的前若干行
    pub async fn checkpoint_preview(&self, limit: usize) -> CheckpointPreviewDto {
        let store = self.runner.shared_store();
        let records = store.load().await;

        if records.is_empty() {
            return CheckpointPreviewDto {
                success: true,
                data: Vec::new(),
                total_rows: 0,
                file: None,
                message: Some("No checkpoint data found".to_string()),
            };
        }

        let total_rows = records.len();
        CheckpointPreviewDto {
            success: true,
            data: records.into_iter().take(limit).collect(),
            total_rows,
            file: Some(store.location()),
            message: None,
        }
    }

    pub async fn clear_checkpoint(&self) -> Result<(), JobError> {
        let store = self.runner.shared_store();
        if !store.exists().await {
            debug!("No checkpoint to clear at {}", store.location());
            return Ok(());
        }
        store.clear().await?;
        info!("Cleared checkpoint {}", store.location());
        Ok(())
    }
}

/// 下载文件名，取 id 前 8 位
pub fn download_name(task_id: Uuid) -> String {
    let id = task_id.simple().to_string();
    format!("maps_scraped_{}.csv", &id[..8])
}
