// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供后台任务处理功能
/// 包括单个任务的执行、状态维护和过期任务清理
pub mod eviction_worker;
pub mod scrape_task;
pub mod task_runner;
