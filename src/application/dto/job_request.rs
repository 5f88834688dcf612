// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

use crate::domain::models::job::{ExtractionDepth, JobConfig, JobKind, QueryTarget, SearchArea};
use crate::domain::models::task::DomainError;
use crate::utils::url_utils::Coordinate;

pub const DEFAULT_RESULT_CAP: usize = 20;
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_ZOOM: u8 = 14;

/// 抓取任务请求数据传输对象
///
/// 提交时只做反序列化，校验和到 `JobConfig` 的转换在任务开始执行后进行，
/// 配置错误会让任务进入 failed 状态而不是让提交失败。
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct JobRequestDto {
    /// `poi` / `radius_scan` 或 `search` / `single_query`
    pub task_type: Option<String>,
    /// 区域扫描的探测关键词
    pub keywords: Option<Vec<String>>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = 1, max = 21))]
    pub zoom: Option<u8>,
    /// 地名短语，没有坐标时使用
    pub location: Option<String>,
    /// 单查询的搜索文本
    pub query: Option<String>,
    /// 单查询的搜索页URL
    #[validate(url)]
    pub url: Option<String>,
    /// 每个目标的记录上限
    #[validate(range(min = 1, max = 500))]
    pub max_results: Option<usize>,
    /// 间隔（毫秒）
    #[validate(range(max = 60000))]
    pub delay_ms: Option<u64>,
    /// 是否逐条打开详情页
    pub detailed: Option<bool>,
}

impl JobRequestDto {
    fn kind(&self) -> Result<JobKind, DomainError> {
        let task_type = self
            .task_type
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| invalid("task_type is required"))?;

        match task_type {
            "poi" | "radius_scan" | "radius-scan" => Ok(JobKind::RadiusScan {
                keywords: self.keywords()?,
                area: self.area()?,
            }),
            "search" | "single_query" | "single-query" => Ok(JobKind::SingleQuery {
                target: self.query_target()?,
            }),
            other => Err(invalid(format!("Unknown task type: {}", other))),
        }
    }

    fn keywords(&self) -> Result<Vec<String>, DomainError> {
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .flatten()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(invalid("radius scan needs at least one keyword"));
        }
        Ok(keywords)
    }

    fn area(&self) -> Result<SearchArea, DomainError> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Ok(SearchArea::Coordinate(Coordinate {
                latitude,
                longitude,
                zoom: self.zoom.unwrap_or(DEFAULT_ZOOM),
            })),
            (Some(_), None) | (None, Some(_)) => {
                Err(invalid("latitude and longitude must be given together"))
            }
            (None, None) => match non_blank(self.location.as_deref()) {
                Some(location) => Ok(SearchArea::Location(location)),
                None => Err(invalid("radius scan needs a coordinate or a location")),
            },
        }
    }

    fn query_target(&self) -> Result<QueryTarget, DomainError> {
        if let Some(raw) = non_blank(self.url.as_deref()) {
            let url = Url::parse(&raw).map_err(|e| invalid(format!("invalid url '{}': {}", raw, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid(format!("unsupported url scheme: {}", url.scheme())));
            }
            return Ok(QueryTarget::Url(url));
        }
        non_blank(self.query.as_deref())
            .map(QueryTarget::Text)
            .ok_or_else(|| invalid("single query needs a query or a url"))
    }
}

impl TryFrom<&JobRequestDto> for JobConfig {
    type Error = DomainError;

    fn try_from(request: &JobRequestDto) -> Result<Self, Self::Error> {
        request
            .validate()
            .map_err(|e| DomainError::ValidationError(e.to_string()))?;

        Ok(JobConfig {
            kind: request.kind()?,
            result_cap: request.max_results.unwrap_or(DEFAULT_RESULT_CAP),
            pacing: Duration::from_millis(request.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
            depth: if request.detailed.unwrap_or(false) {
                ExtractionDepth::Detailed
            } else {
                ExtractionDepth::Cards
            },
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::ValidationError(message.into())
}

/// 任务提交响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponseDto {
    pub success: bool,
    pub task_id: String,
    pub message: String,
}
