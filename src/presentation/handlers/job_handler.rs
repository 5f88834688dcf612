// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Json, Path},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::job_request::{JobRequestDto, SubmitResponseDto};
use crate::application::dto::task_status::{ActiveTasksResponseDto, SuccessResponseDto};
use crate::application::use_cases::job_service::{JobError, JobService};
use crate::domain::models::task::TaskSnapshot;
use crate::presentation::errors::AppError;

fn parse_task_id(raw: &str) -> Result<Uuid, JobError> {
    Uuid::parse_str(raw.trim()).map_err(|_| JobError::NotFound(raw.to_string()))
}

/// 提交抓取任务
pub async fn start_scraping(
    Extension(service): Extension<Arc<JobService>>,
    Json(payload): Json<JobRequestDto>,
) -> Json<SubmitResponseDto> {
    let task_id = service.submit(payload);
    Json(SubmitResponseDto {
        success: true,
        task_id: task_id.to_string(),
        message: "Scraping task started in background".to_string(),
    })
}

/// 查询任务状态
pub async fn task_status(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<Json<TaskSnapshot>, AppError> {
    let task_id = parse_task_id(&id)?;
    Ok(Json(service.status(task_id)?))
}

/// 停止任务
pub async fn stop_task(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponseDto>, AppError> {
    let task_id = parse_task_id(&id)?;
    service.stop(task_id)?;
    Ok(Json(SuccessResponseDto::ok()))
}

/// 下载结果 CSV
pub async fn download_results(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let task_id = parse_task_id(&id)?;
    let artifact = service.result(task_id).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        ),
    ];
    Ok((headers, artifact.bytes))
}

/// 列出所有任务
pub async fn active_tasks(
    Extension(service): Extension<Arc<JobService>>,
) -> Json<ActiveTasksResponseDto> {
    Json(ActiveTasksResponseDto {
        tasks: service.list(),
    })
}
