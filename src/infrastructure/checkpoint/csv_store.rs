// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tokio::fs;
use tracing::{debug, warn};

use super::csv_codec;
use crate::domain::models::record::{merge, Record};
use crate::domain::repositories::checkpoint_repository::{
    CheckpointBackend, CheckpointError, CheckpointRepository,
};

/// 本地 CSV 文件检查点
///
/// 每次写入先写临时文件再重命名，读取方只会看到完整的旧文件或完整的新文件。
/// 同一文件上的读改写由一把异步锁串行化。
pub struct CsvFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl CsvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    async fn read_records(&self) -> Result<Vec<Record>, CheckpointError> {
        match fs::read(&self.path).await {
            Ok(bytes) => csv_codec::decode(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }

    async fn write_records(&self, records: &[Record]) -> Result<(), CheckpointError> {
        let bytes = csv_codec::encode(records)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.sibling(".tmp");
        fs::write(&tmp, &bytes).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CheckpointError::Io(e));
        }
        Ok(())
    }

    /// 把无法解析的文件移到 `<file>.corrupt`，随后从空集合重新开始
    async fn quarantine(&self, reason: &CheckpointError) -> Result<(), CheckpointError> {
        let target = self.sibling(".corrupt");
        warn!(
            "Checkpoint {} is unreadable ({}), moving it to {}",
            self.path.display(),
            reason,
            target.display()
        );
        fs::rename(&self.path, &target).await?;
        Ok(())
    }
}

fn is_corruption(error: &CheckpointError) -> bool {
    matches!(error, CheckpointError::Corrupt(_) | CheckpointError::Csv(_))
}

#[async_trait]
impl CheckpointRepository for CsvFileStore {
    async fn save(&self, batch: &[Record]) -> Result<usize, CheckpointError> {
        let _guard = self.write_lock.lock().await;

        let existing = match self.read_records().await {
            Ok(records) => records,
            Err(e) if is_corruption(&e) => {
                self.quarantine(&e).await?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        if batch.is_empty() {
            return Ok(existing.len());
        }

        let merged = merge(existing, batch);
        self.write_records(&merged).await?;

        debug!(
            "Checkpoint {} now holds {} rows ({} in batch)",
            self.path.display(),
            merged.len(),
            batch.len()
        );
        Ok(merged.len())
    }

    async fn replace(&self, records: &[Record]) -> Result<(), CheckpointError> {
        let _guard = self.write_lock.lock().await;
        self.write_records(records).await
    }

    async fn load(&self) -> Vec<Record> {
        match self.read_records().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to load checkpoint {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    async fn clear(&self) -> Result<(), CheckpointError> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }

    async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, CheckpointError> {
        match fs::read(&self.path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }

    fn location(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// 本地文件检查点后端
///
/// 键映射为 `<base_dir>/<key>.csv`。仍被使用的存储实例按键复用，
/// 保证并发写入同一文件的任务共用同一把锁。
pub struct CsvFileBackend {
    base_dir: PathBuf,
    stores: Mutex<HashMap<String, Weak<CsvFileStore>>>,
}

impl CsvFileBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    fn open_store(&self, key: &str) -> Arc<CsvFileStore> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(key).and_then(Weak::upgrade) {
            return store;
        }

        stores.retain(|_, store| store.strong_count() > 0);
        let store = Arc::new(CsvFileStore::new(self.base_dir.join(format!("{}.csv", key))));
        stores.insert(key.to_string(), Arc::downgrade(&store));
        store
    }
}

impl CheckpointBackend for CsvFileBackend {
    fn open(&self, key: &str) -> Arc<dyn CheckpointRepository> {
        self.open_store(key)
    }
}
