// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;

use mapscout::domain::models::record::Record;
use mapscout::domain::repositories::checkpoint_repository::{
    CheckpointBackend, CheckpointError, CheckpointRepository,
};
use mapscout::infrastructure::checkpoint::InMemoryCheckpointBackend;

/// 写入失败的检查点后端
///
/// 批量保存总是失败；`fail_replace` 为真时最终结果写入也失败。
/// 其余操作交给内存后端。
pub struct FailingCheckpointBackend {
    inner: InMemoryCheckpointBackend,
    fail_replace: bool,
}

impl FailingCheckpointBackend {
    /// 所有写入都失败
    pub fn all_writes() -> Self {
        Self {
            inner: InMemoryCheckpointBackend::new(),
            fail_replace: true,
        }
    }

    /// 只有批量保存失败
    pub fn batch_writes() -> Self {
        Self {
            inner: InMemoryCheckpointBackend::new(),
            fail_replace: false,
        }
    }
}

impl CheckpointBackend for FailingCheckpointBackend {
    fn open(&self, key: &str) -> Arc<dyn CheckpointRepository> {
        Arc::new(FailingStore {
            inner: self.inner.open(key),
            fail_replace: self.fail_replace,
        })
    }
}

struct FailingStore {
    inner: Arc<dyn CheckpointRepository>,
    fail_replace: bool,
}

fn disk_full() -> CheckpointError {
    CheckpointError::Io(std::io::Error::other("disk full"))
}

#[async_trait]
impl CheckpointRepository for FailingStore {
    async fn save(&self, _batch: &[Record]) -> Result<usize, CheckpointError> {
        Err(disk_full())
    }

    async fn replace(&self, records: &[Record]) -> Result<(), CheckpointError> {
        if self.fail_replace {
            return Err(disk_full());
        }
        self.inner.replace(records).await
    }

    async fn load(&self) -> Vec<Record> {
        self.inner.load().await
    }

    async fn clear(&self) -> Result<(), CheckpointError> {
        self.inner.clear().await
    }

    async fn exists(&self) -> bool {
        self.inner.exists().await
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, CheckpointError> {
        self.inner.read_bytes().await
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}
