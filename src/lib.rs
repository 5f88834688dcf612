// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含任务提交、查询和结果获取的用例
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体和仓库接口
pub mod domain;

/// 引擎模块
///
/// 提取器接口和基于浏览器的地图搜索提取器
pub mod engines;

/// 基础设施模块
///
/// 提供检查点存储和指标导出
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由和处理器
pub mod presentation;

/// 队列模块
///
/// 进程内任务表
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 任务执行和过期任务清理
pub mod workers;
