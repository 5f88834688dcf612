// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含任务提交、查询、停止和结果获取的用例实现，
/// 以及 API 请求与领域模型之间的数据传输对象
pub mod dto;
pub mod use_cases;
