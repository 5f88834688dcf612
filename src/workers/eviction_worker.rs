// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::settings::RegistrySettings;
use crate::queue::task_registry::TaskRegistry;

/// 任务清理工作器
///
/// 定期从任务表中移除已结束且过期的任务。结果文件不受影响，
/// 被移除任务的结果仍可按 id 下载。
pub struct EvictionWorker {
    registry: Arc<TaskRegistry>,
    interval: Duration,
    max_age: Duration,
    shutdown: CancellationToken,
}

impl EvictionWorker {
    pub fn new(registry: Arc<TaskRegistry>, settings: &RegistrySettings) -> Self {
        Self {
            registry,
            interval: settings.eviction_interval(),
            max_age: settings.max_task_age(),
            shutdown: CancellationToken::new(),
        }
    }

    /// 覆盖扫描间隔和过期时长
    pub fn with_timing(mut self, interval: Duration, max_age: Duration) -> Self {
        self.interval = interval;
        self.max_age = max_age;
        self
    }

    /// 停止信号
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!(
            "Task eviction worker started (every {:?}, max age {:?})",
            self.interval, self.max_age
        );

        let mut interval = tokio::time::interval(self.interval.max(Duration::from_secs(1)));

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let count = self.registry.evict_stale(self.max_age);
            if count > 0 {
                info!("Evicted {} finished tasks", count);
            }
        }

        info!("Task eviction worker stopped");
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}
