// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 任务状态枚举
///
/// 表示任务在其生命周期中的不同状态。状态转换遵循以下流程：
/// Pending → Running → Completed/Stopped/Failed
///
/// 三个终态不可再转换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 已创建，尚未开始执行
    #[default]
    Pending,
    /// 正在执行
    Running,
    /// 提取工作自然结束或达到上限
    Completed,
    /// 观察到取消请求后提前退出
    Stopped,
    /// 执行过程中出现未处理的错误
    Failed,
}

impl TaskStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Stopped | TaskStatus::Failed
        )
    }

    /// 判断状态转换是否合法
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Pending, TaskStatus::Running) => true,
            (TaskStatus::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Stopped => write!(f, "stopped"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "stopped" => Ok(TaskStatus::Stopped),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 任务状态快照
///
/// 固定结构的状态值。执行方每次整体替换，轮询方读取到的总是某一次完整写入，
/// 不会看到只更新了一半的字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: Uuid,
    pub status: TaskStatus,
    /// 进度 (0.0-1.0)，单次运行内单调不减
    pub progress: f64,
    /// 最新的提示信息，不累积
    pub message: String,
    pub started_at: Option<DateTime<Utc>>,
    pub total_results: usize,
    /// 结果文件位置
    pub results_file: String,
}

impl TaskSnapshot {
    pub fn new(task_id: Uuid, results_file: String) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            progress: 0.0,
            message: "Initializing...".to_string(),
            started_at: None,
            total_results: 0,
            results_file,
        }
    }

    /// 进入运行状态
    pub fn start(&self) -> Result<Self, DomainError> {
        self.transition(TaskStatus::Running).map(|mut next| {
            next.started_at = Some(Utc::now());
            next
        })
    }

    /// 转换到新状态，非法转换返回错误且不修改原值
    pub fn transition(&self, next: TaskStatus) -> Result<Self, DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        Ok(Self {
            status: next,
            ..self.clone()
        })
    }

    /// 推进进度，较小的值被忽略以保持单调
    pub fn advance(&self, progress: f64, message: impl Into<String>) -> Self {
        Self {
            progress: self.progress.max(progress.clamp(0.0, 1.0)),
            message: message.into(),
            ..self.clone()
        }
    }
}

/// 领域错误类型
///
/// 表示在领域层可能发生的各种错误情况，包括状态转换错误和配置校验失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 无效的状态转换，当任务状态转换不符合业务规则时发生
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },

    /// 验证错误，当任务配置不符合规则时发生
    #[error("Validation error: {0}")]
    ValidationError(String),
}
