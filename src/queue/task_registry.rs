// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::workers::scrape_task::ScrapeTask;

/// 进程内任务表
///
/// 锁只在访问表的瞬间持有，从不跨越提取器调用或任何 await
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<Uuid, Arc<ScrapeTask>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记任务，同 id 的旧任务被替换
    pub fn add(&self, task: Arc<ScrapeTask>) {
        self.tasks.lock().insert(task.id(), task);
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<ScrapeTask>> {
        self.tasks.lock().get(&id).cloned()
    }

    /// 转发停止请求，任务不存在时返回 false
    ///
    /// 已处于终态的任务不受影响，但仍返回 true
    pub fn request_stop(&self, id: Uuid) -> bool {
        match self.get(id) {
            Some(task) => {
                task.stop();
                true
            }
            None => false,
        }
    }

    /// 当前任务表的拷贝
    pub fn snapshot(&self) -> HashMap<Uuid, Arc<ScrapeTask>> {
        self.tasks.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// 移除已结束且开始时间早于 `max_age` 之前的任务，返回移除数量
    pub fn evict_stale(&self, max_age: Duration) -> usize {
        self.evict_stale_at(Utc::now(), max_age)
    }

    pub fn evict_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|_, task| {
            let snapshot = task.snapshot();
            if !snapshot.status.is_terminal() {
                return true;
            }
            match snapshot.started_at {
                Some(started_at) => !(now - started_at)
                    .to_std()
                    .map(|age| age > max_age)
                    .unwrap_or(false),
                None => true,
            }
        });
        before - tasks.len()
    }
}
