// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json};
use std::sync::Arc;

use crate::application::dto::task_status::{CheckpointPreviewDto, SuccessResponseDto};
use crate::application::use_cases::job_service::{JobService, PREVIEW_ROWS};
use crate::presentation::errors::AppError;

/// 预览共享检查点
pub async fn get_checkpoint(
    Extension(service): Extension<Arc<JobService>>,
) -> Json<CheckpointPreviewDto> {
    Json(service.checkpoint_preview(PREVIEW_ROWS).await)
}

/// 清空共享检查点
pub async fn clear_checkpoint(
    Extension(service): Extension<Arc<JobService>>,
) -> Result<Json<SuccessResponseDto>, AppError> {
    service.clear_checkpoint().await?;
    Ok(Json(SuccessResponseDto::ok()))
}
