// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// 单条记录的提取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// 所有字段均已读取
    #[default]
    Ok,
    /// 仅读取到部分字段
    Partial,
    /// 读取超时
    Timeout,
    /// 读取失败
    Error,
}

impl RecordStatus {
    /// 是否为失败占位记录
    pub fn is_failure(&self) -> bool {
        matches!(self, RecordStatus::Timeout | RecordStatus::Error)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordStatus::Ok => write!(f, "ok"),
            RecordStatus::Partial => write!(f, "partial"),
            RecordStatus::Timeout => write!(f, "timeout"),
            RecordStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(RecordStatus::Ok),
            "partial" => Ok(RecordStatus::Partial),
            "timeout" => Ok(RecordStatus::Timeout),
            "error" => Ok(RecordStatus::Error),
            _ => Err(()),
        }
    }
}

/// 商家记录
///
/// 一条抓取到的地图商家信息。`source_link` 是商家在地图上的规范链接，
/// 用作去重键：链接相同的两条记录代表同一个商家。
/// 只有失败占位记录的 `source_link` 允许为空。
///
/// 字段顺序即检查点文件的列顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Record {
    pub name: String,
    /// 评分 (0.0-5.0)
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub phone: String,
    pub category: String,
    pub address: String,
    pub website: Option<String>,
    pub source_link: String,
    /// 产生该记录的探测关键词，单查询任务为空
    pub probe: String,
    pub status: RecordStatus,
    /// 诊断信息
    pub status_detail: Option<String>,
}

/// 去重键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Link(String),
    /// 占位记录按整行内容区分，互不合并，完全相同的重放行除外
    Placeholder(Vec<String>),
}

impl Record {
    /// 创建失败占位记录
    ///
    /// 除诊断信息和探测词外所有字段为空
    pub fn failure(status: RecordStatus, probe: &str, detail: impl Into<String>) -> Self {
        Self {
            probe: probe.to_string(),
            status,
            status_detail: Some(detail.into()),
            ..Default::default()
        }
    }

    /// 标记记录来源的探测关键词
    pub fn tagged(mut self, probe: &str) -> Self {
        self.probe = probe.to_string();
        self
    }

    fn dedup_key(&self) -> DedupKey {
        if !self.source_link.is_empty() {
            return DedupKey::Link(self.source_link.clone());
        }
        DedupKey::Placeholder(vec![
            self.name.clone(),
            self.rating.map(|r| r.to_string()).unwrap_or_default(),
            self.review_count.map(|c| c.to_string()).unwrap_or_default(),
            self.phone.clone(),
            self.category.clone(),
            self.address.clone(),
            self.website.clone().unwrap_or_default(),
            self.probe.clone(),
            self.status.to_string(),
            self.status_detail.clone().unwrap_or_default(),
        ])
    }
}

/// 按 `source_link` 去重，保留最后一次出现的记录
///
/// 被保留的记录位于其最后一次出现的位置，与检查点合并规则一致。
pub fn dedup_keep_last(records: Vec<Record>) -> Vec<Record> {
    let mut last_index: HashMap<DedupKey, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        last_index.insert(record.dedup_key(), i);
    }
    records
        .into_iter()
        .enumerate()
        .filter(|(i, record)| last_index.get(&record.dedup_key()) == Some(i))
        .map(|(_, record)| record)
        .collect()
}

/// 按 `source_link` 去重，保留第一次出现的记录
pub fn dedup_keep_first(records: Vec<Record>) -> Vec<Record> {
    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.dedup_key()))
        .collect()
}

/// 将一批记录合并进已有集合（后写入者胜出）
pub fn merge(existing: Vec<Record>, batch: &[Record]) -> Vec<Record> {
    let mut combined = existing;
    combined.extend_from_slice(batch);
    dedup_keep_last(combined)
}
