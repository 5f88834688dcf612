// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::dto::job_request::JobRequestDto;
use crate::domain::models::task::{DomainError, TaskSnapshot};

/// 一次抓取任务
///
/// 持有提交时的请求、取消令牌和状态快照。快照只由执行方整体替换，
/// 轮询方通过 `snapshot` 或订阅拿到的总是一次完整的写入。
pub struct ScrapeTask {
    id: Uuid,
    request: JobRequestDto,
    results_key: String,
    cancel: CancellationToken,
    status: watch::Sender<TaskSnapshot>,
}

impl ScrapeTask {
    pub fn new(
        id: Uuid,
        request: JobRequestDto,
        results_key: String,
        results_location: String,
    ) -> Self {
        let (status, _) = watch::channel(TaskSnapshot::new(id, results_location));
        Self {
            id,
            request,
            results_key,
            cancel: CancellationToken::new(),
            status,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &JobRequestDto {
        &self.request
    }

    /// 结果存储的键
    pub fn results_key(&self) -> &str {
        &self.results_key
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> TaskSnapshot {
        self.status.borrow().clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.status.subscribe()
    }

    /// 请求停止
    ///
    /// 已处于终态时什么也不做，返回 false
    pub fn stop(&self) -> bool {
        if self.status.borrow().status.is_terminal() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    /// 以 `f` 的结果整体替换快照，`f` 返回错误时保持原值
    pub(crate) fn update<F>(&self, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&TaskSnapshot) -> Result<TaskSnapshot, DomainError>,
    {
        let mut outcome = Ok(());
        self.status.send_if_modified(|current| match f(current) {
            Ok(next) => {
                *current = next;
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    pub(crate) fn advance(&self, progress: f64, message: impl Into<String>) {
        let message = message.into();
        self.status.send_modify(|current| *current = current.advance(progress, message));
    }
}
