// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::domain::models::record::Record;
use crate::domain::models::task::TaskSnapshot;

/// 任务列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveTasksResponseDto {
    pub tasks: Vec<TaskSnapshot>,
}

/// 共享检查点预览响应
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointPreviewDto {
    pub success: bool,
    /// 最多前 100 行
    pub data: Vec<Record>,
    pub total_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 简单的成功响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponseDto {
    pub success: bool,
}

impl SuccessResponseDto {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
