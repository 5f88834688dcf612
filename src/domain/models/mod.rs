// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 任务配置（job）：一次抓取的不可变输入
/// - 商家记录（record）：抓取结果行及其去重规则
/// - 任务（task）：生命周期状态和状态快照
pub mod job;
pub mod record;
pub mod task;
