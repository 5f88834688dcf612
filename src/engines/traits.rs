// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::models::job::{ExtractionDepth, SearchTarget};
use crate::domain::models::record::{Record, RecordStatus};

/// 提取器错误类型
#[derive(Error, Debug, Clone)]
pub enum ExtractError {
    /// 打开搜索页失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 超时
    #[error("Timeout: {0}")]
    Timeout(String),
    /// 浏览器会话不可用
    #[error("Browser error: {0}")]
    Browser(String),
    /// 调用方已取消
    #[error("Cancelled")]
    Cancelled,
}

impl ExtractError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractError::Navigation(_) | ExtractError::Timeout(_) => true,
            ExtractError::Browser(_) => true,
            ExtractError::Cancelled => false,
        }
    }

    /// 放弃重试后写入占位记录时使用的状态
    pub fn placeholder_status(&self) -> RecordStatus {
        match self {
            ExtractError::Timeout(_) => RecordStatus::Timeout,
            _ => RecordStatus::Error,
        }
    }
}

/// 提取请求
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub target: SearchTarget,
    /// 最多产出的记录数
    pub result_cap: usize,
    /// 条目之间的间隔
    pub pacing: Duration,
    pub depth: ExtractionDepth,
    /// 取消令牌，提取器应尽早停止滚动和访问详情
    pub cancel: CancellationToken,
}

/// 提取过程中产生的事件
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractEvent {
    /// 详情模式下第一阶段结束，共收集到的链接数
    LinksCollected(usize),
    /// 一条记录，读取失败时为降级记录
    Record(Record),
}

/// 提取器特质
///
/// `collect` 完成导航后返回惰性的事件流，导航失败通过 `Err` 返回。
/// 单条记录的失败不会中断流，而是以 `status` 为 error/timeout 的记录出现。
/// 降级记录应尽量保留 `source_link`；没有链接的降级记录按整行内容去重，
/// 必须在 `status_detail` 中带上能区分条目的信息（例如条目序号），
/// 否则内容相同的两行会被合并为一行。
/// 丢弃事件流即结束本次会话。
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn collect(
        &self,
        request: &CollectRequest,
    ) -> Result<BoxStream<'static, ExtractEvent>, ExtractError>;

    /// 提取器名称
    fn name(&self) -> &'static str;
}
