// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;

use crate::domain::models::record::{Record, RecordStatus};
use crate::domain::repositories::checkpoint_repository::CheckpointError;

/// 检查点文件的列顺序
pub const COLUMNS: [&str; 11] = [
    "name",
    "rating",
    "review_count",
    "phone",
    "category",
    "address",
    "website",
    "source_link",
    "probe",
    "status",
    "status_detail",
];

/// 将记录编码为带表头的 CSV
///
/// 空集合也会写出表头，保证结果文件始终是合法的表格
pub fn encode(records: &[Record]) -> Result<Vec<u8>, CheckpointError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| CheckpointError::Io(e.into_error()))
}

/// 解析 CSV 检查点
///
/// 按字段宽松解析：无法解析的数值视为缺失，未知状态视为 `partial`，
/// 缺少的列取默认值，多余的列被忽略。整体结构不可读时返回 `Corrupt`。
pub fn decode(bytes: &[u8]) -> Result<Vec<Record>, CheckpointError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h.trim() == "source_link") {
        return Err(CheckpointError::Corrupt(
            "missing source_link column".to_string(),
        ));
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<RawRow>() {
        records.push(Record::from(row?));
    }
    Ok(records)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRow {
    name: String,
    rating: String,
    review_count: String,
    phone: String,
    category: String,
    address: String,
    website: String,
    source_link: String,
    probe: String,
    status: String,
    status_detail: String,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<RawRow> for Record {
    fn from(row: RawRow) -> Self {
        Record {
            name: row.name,
            rating: row
                .rating
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|r| (0.0..=5.0).contains(r)),
            review_count: row.review_count.trim().parse().ok(),
            phone: row.phone,
            category: row.category,
            address: row.address,
            website: non_empty(row.website),
            source_link: row.source_link,
            probe: row.probe,
            status: row.status.trim().parse().unwrap_or(RecordStatus::Partial),
            status_detail: non_empty(row.status_detail),
        }
    }
}
