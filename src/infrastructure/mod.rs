// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，依赖于领域层的抽象接口。
///
/// 包含的子模块：
/// - 检查点（checkpoint）：CSV 文件和内存两种检查点存储
/// - 指标（metrics）：Prometheus 导出器和计数器
pub mod checkpoint;
pub mod metrics;
