// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 任务表模块
///
/// 进程内的任务登记、查找、停止转发和过期清理
pub mod task_registry;
