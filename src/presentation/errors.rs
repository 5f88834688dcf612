// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::use_cases::job_service::JobError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();

        let (status, body) = match self.0.downcast_ref::<JobError>() {
            Some(JobError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, json!({ "error": error_message }))
            }
            Some(JobError::NotReady(snapshot)) => (
                StatusCode::CONFLICT,
                json!({ "error": error_message, "task_status": snapshot }),
            ),
            Some(JobError::Storage(_)) | None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": error_message }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
