// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::csv_codec;
use crate::domain::models::record::{merge, Record};
use crate::domain::repositories::checkpoint_repository::{
    CheckpointBackend, CheckpointError, CheckpointRepository,
};

/// 内存检查点（用于测试和不落盘的部署）
pub struct InMemoryCheckpointStore {
    key: String,
    // None 表示从未写入
    data: RwLock<Option<Vec<Record>>>,
}

impl InMemoryCheckpointStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: RwLock::new(None),
        }
    }
}

#[async_trait]
impl CheckpointRepository for InMemoryCheckpointStore {
    async fn save(&self, batch: &[Record]) -> Result<usize, CheckpointError> {
        let mut data = self.data.write().await;
        if batch.is_empty() {
            return Ok(data.as_ref().map_or(0, Vec::len));
        }
        let merged = merge(data.take().unwrap_or_default(), batch);
        let total = merged.len();
        *data = Some(merged);
        Ok(total)
    }

    async fn replace(&self, records: &[Record]) -> Result<(), CheckpointError> {
        *self.data.write().await = Some(records.to_vec());
        Ok(())
    }

    async fn load(&self) -> Vec<Record> {
        self.data.read().await.clone().unwrap_or_default()
    }

    async fn clear(&self) -> Result<(), CheckpointError> {
        *self.data.write().await = None;
        Ok(())
    }

    async fn exists(&self) -> bool {
        self.data.read().await.is_some()
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, CheckpointError> {
        match self.data.read().await.as_deref() {
            Some(records) => csv_codec::encode(records).map(Some),
            None => Ok(None),
        }
    }

    fn location(&self) -> String {
        format!("memory://{}", self.key)
    }
}

/// 内存检查点后端
#[derive(Default)]
pub struct InMemoryCheckpointBackend {
    stores: Mutex<HashMap<String, Arc<InMemoryCheckpointStore>>>,
}

impl InMemoryCheckpointBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointBackend for InMemoryCheckpointBackend {
    fn open(&self, key: &str) -> Arc<dyn CheckpointRepository> {
        self.stores
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(InMemoryCheckpointStore::new(key)))
            .clone()
    }
}
