// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 检查点存储实现
//!
//! - `csv_codec`：记录与 CSV 之间的编解码
//! - `csv_store`：本地文件实现
//! - `memory_store`：内存实现

pub mod csv_codec;
pub mod csv_store;
pub mod memory_store;

use std::sync::Arc;

use crate::config::settings::StorageSettings;
use crate::domain::repositories::checkpoint_repository::{CheckpointBackend, CheckpointError};

pub use csv_store::{CsvFileBackend, CsvFileStore};
pub use memory_store::{InMemoryCheckpointBackend, InMemoryCheckpointStore};

/// 检查点后端工厂函数
pub fn create_checkpoint_backend(
    settings: &StorageSettings,
) -> Result<Arc<dyn CheckpointBackend>, CheckpointError> {
    match settings.storage_type.as_str() {
        "local" => Ok(Arc::new(CsvFileBackend::new(&settings.local_path))),
        "memory" => Ok(Arc::new(InMemoryCheckpointBackend::new())),
        other => Err(CheckpointError::Unsupported(other.to_string())),
    }
}
