// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::domain::models::record::{dedup_keep_first, dedup_keep_last, Record};
use crate::domain::models::task::DomainError;
use crate::utils::url_utils::{build_search_url, Coordinate};

/// 提取深度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionDepth {
    /// 只读取结果列表中的卡片，速度快但字段不全
    #[default]
    Cards,
    /// 逐个打开详情页读取完整字段
    Detailed,
}

/// 区域扫描的定位方式
#[derive(Debug, Clone, PartialEq)]
pub enum SearchArea {
    /// 以坐标为中心
    Coordinate(Coordinate),
    /// 以地名短语定位，例如 "Austin, TX"
    Location(String),
}

/// 单查询任务的目标
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTarget {
    /// 搜索文本
    Text(String),
    /// 直接给出的搜索页URL
    Url(Url),
}

/// 任务种类
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    /// 在同一区域内依次探测多个关键词
    RadiusScan {
        keywords: Vec<String>,
        area: SearchArea,
    },
    /// 对单个目标执行一次查询
    SingleQuery { target: QueryTarget },
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobKind::RadiusScan { .. } => write!(f, "radius-scan"),
            JobKind::SingleQuery { .. } => write!(f, "single-query"),
        }
    }
}

/// 一次提取的目标
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTarget {
    /// 展示用名称
    pub label: String,
    /// 区域扫描时的探测关键词
    pub probe: Option<String>,
    pub url: Url,
}

/// 任务配置
///
/// 提交时的请求在任务开始执行后转换为该结构，此后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub kind: JobKind,
    /// 每个目标最多提取的记录数
    pub result_cap: usize,
    /// 条目之间、探测之间的间隔
    pub pacing: Duration,
    pub depth: ExtractionDepth,
}

impl JobConfig {
    /// 展开为逐个执行的提取目标
    pub fn targets(&self) -> Result<Vec<SearchTarget>, DomainError> {
        match &self.kind {
            JobKind::SingleQuery { target } => {
                let target = match target {
                    QueryTarget::Url(url) => SearchTarget {
                        label: url.to_string(),
                        probe: None,
                        url: url.clone(),
                    },
                    QueryTarget::Text(query) => SearchTarget {
                        label: query.clone(),
                        probe: None,
                        url: search_url(query, None)?,
                    },
                };
                Ok(vec![target])
            }
            JobKind::RadiusScan { keywords, area } => keywords
                .iter()
                .map(|keyword| {
                    let (label, url) = match area {
                        SearchArea::Coordinate(c) => (
                            format!("{} @ {},{}", keyword, c.latitude, c.longitude),
                            search_url(keyword, Some(*c))?,
                        ),
                        SearchArea::Location(location) => {
                            let query = format!("{} near {}", keyword, location);
                            let url = search_url(&query, None)?;
                            (query, url)
                        }
                    };
                    Ok(SearchTarget {
                        label,
                        probe: Some(keyword.clone()),
                        url,
                    })
                })
                .collect(),
        }
    }

    /// 最终结果去重
    ///
    /// 区域扫描中不同探测可能命中同一商家，保留最先出现者；
    /// 单查询保留最后出现者
    pub fn finalize(&self, records: Vec<Record>) -> Vec<Record> {
        match self.kind {
            JobKind::RadiusScan { .. } => dedup_keep_first(records),
            JobKind::SingleQuery { .. } => dedup_keep_last(records),
        }
    }
}

fn search_url(query: &str, coordinate: Option<Coordinate>) -> Result<Url, DomainError> {
    build_search_url(query, coordinate)
        .map_err(|e| DomainError::ValidationError(format!("invalid search target '{}': {}", query, e)))
}
