// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::models::record::Record;

/// 检查点错误类型
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV 编解码错误
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// 已持久化的内容无法解析
    #[error("Corrupt checkpoint: {0}")]
    Corrupt(String),
    /// 不支持的存储类型
    #[error("Unsupported storage type: {0}")]
    Unsupported(String),
}

/// 检查点仓库特质
///
/// 带去重的持久化结果集。每次 `save` 都把新批次合并进已持久化的集合，
/// 再整体写回，任意批次边界之后的存储内容都可以重新加载。
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// 合并一批记录并写回，返回合并后的总行数
    ///
    /// 空批次不做任何写入
    async fn save(&self, batch: &[Record]) -> Result<usize, CheckpointError>;

    /// 以给定集合整体覆盖已持久化内容
    async fn replace(&self, records: &[Record]) -> Result<(), CheckpointError>;

    /// 读取当前集合，不存在或已损坏时返回空集合
    async fn load(&self) -> Vec<Record>;

    /// 删除已持久化内容，重复调用不报错
    async fn clear(&self) -> Result<(), CheckpointError>;

    /// 是否已持久化过内容
    async fn exists(&self) -> bool;

    /// 读取原始的 CSV 字节
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, CheckpointError>;

    /// 存储位置（文件路径或内存键）
    fn location(&self) -> String;
}

/// 检查点后端
///
/// 按键打开检查点仓库，同一个键总是返回同一个实例，
/// 使共享同一份数据的任务共用一把锁
pub trait CheckpointBackend: Send + Sync {
    fn open(&self, key: &str) -> Arc<dyn CheckpointRepository>;
}
