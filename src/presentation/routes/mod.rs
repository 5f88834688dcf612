// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::use_cases::job_service::JobService;
use crate::presentation::handlers::{checkpoint_handler, job_handler};

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(service: Arc<JobService>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let api_routes = Router::new()
        .route("/api/start_scraping", post(job_handler::start_scraping))
        .route("/api/task_status/{id}", get(job_handler::task_status))
        .route("/api/stop_task/{id}", post(job_handler::stop_task))
        .route(
            "/api/download_results/{id}",
            get(job_handler::download_results),
        )
        .route("/api/active_tasks", get(job_handler::active_tasks))
        .route("/api/get_checkpoint", get(checkpoint_handler::get_checkpoint))
        .route(
            "/api/clear_checkpoint",
            post(checkpoint_handler::clear_checkpoint),
        );

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
