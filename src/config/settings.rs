// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含服务器、存储、检查点、并发、重试、任务表、提取器和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// 检查点配置
    pub checkpoint: CheckpointSettings,
    /// 并发控制配置
    pub concurrency: ConcurrencySettings,
    /// 导航重试配置
    pub retry: RetrySettings,
    /// 任务表配置
    pub registry: RegistrySettings,
    /// 浏览器提取器配置
    pub extractor: ExtractorSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 存储类型 (local, memory)
    pub storage_type: String,
    /// 本地存储根路径 (当 type=local 时使用)
    pub local_path: String,
    /// 任务结果文件所在的子目录
    pub results_dir: String,
    /// 共享检查点文件名（不含扩展名）
    pub checkpoint_file: String,
}

/// 检查点作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointScope {
    /// 所有任务同时写入同一个共享检查点
    Shared,
    /// 每个任务只写自己的结果文件
    PerTask,
}

/// 检查点配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointSettings {
    pub scope: CheckpointScope,
    /// 每累计多少条记录写一次检查点
    pub batch_size: usize,
}

/// 并发控制配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencySettings {
    /// 同时持有提取器会话的任务上限
    pub max_sessions: usize,
}

/// 导航重试配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_factor: f64,
}

/// 任务表配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    /// 终态任务保留时长（小时）
    pub max_task_age_hours: u64,
    /// 清理扫描间隔（秒）
    pub eviction_interval_secs: u64,
}

impl RegistrySettings {
    pub fn max_task_age(&self) -> Duration {
        Duration::from_secs(self.max_task_age_hours * 3600)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs.max(1))
    }
}

/// 浏览器提取器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorSettings {
    /// 是否以无头模式启动浏览器
    pub headless: bool,
    /// 远程调试地址，设置后连接已有的 Chrome 实例
    pub remote_debugging_url: Option<String>,
    /// 打开搜索页的超时时间（秒）
    pub navigation_timeout_secs: u64,
    /// 单条详情提取的超时时间（秒）
    pub item_timeout_secs: u64,
    /// 结果列表最多滚动次数
    pub max_scroll_rounds: u32,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default`、`config/{APP_ENVIRONMENT}` 和
    /// `MAPSCOUT__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("MAPSCOUT").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅使用内置默认值
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            // Storage
            .set_default("storage.storage_type", "local")?
            .set_default("storage.local_path", "./storage")?
            .set_default("storage.results_dir", "temp")?
            .set_default("storage.checkpoint_file", "checkpoint_results")?
            // Checkpointing
            .set_default("checkpoint.scope", "shared")?
            .set_default("checkpoint.batch_size", 10)?
            .set_default("concurrency.max_sessions", 2)?
            // Navigation retries
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.initial_backoff_ms", 1000)?
            .set_default("retry.max_backoff_ms", 10000)?
            .set_default("retry.jitter_factor", 0.1)?
            .set_default("registry.max_task_age_hours", 24)?
            .set_default("registry.eviction_interval_secs", 3600)?
            // Browser extractor
            .set_default("extractor.headless", true)?
            .set_default("extractor.navigation_timeout_secs", 30)?
            .set_default("extractor.item_timeout_secs", 15)?
            .set_default("extractor.max_scroll_rounds", 20)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
