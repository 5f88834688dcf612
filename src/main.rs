// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use mapscout::application::use_cases::job_service::JobService;
use mapscout::config::settings::Settings;
use mapscout::engines::maps_engine::MapsEngine;
use mapscout::engines::traits::Extractor;
use mapscout::infrastructure::checkpoint::create_checkpoint_backend;
use mapscout::presentation::routes;
use mapscout::queue::task_registry::TaskRegistry;
use mapscout::utils::telemetry;
use mapscout::workers::eviction_worker::EvictionWorker;
use mapscout::workers::task_runner::TaskRunner;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting mapscout...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    mapscout::infrastructure::metrics::init_metrics(&settings.metrics);

    // 3. Checkpoint storage
    let backend = create_checkpoint_backend(&settings.storage)?;
    info!(
        "Checkpoint storage: {} ({:?} scope)",
        settings.storage.storage_type, settings.checkpoint.scope
    );

    // 4. Extractor and task runner
    let extractor: Arc<dyn Extractor> = Arc::new(MapsEngine::new(settings.extractor.clone()));
    info!("Extractor: {}", extractor.name());
    let runner = Arc::new(TaskRunner::new(extractor, backend, &settings));
    let registry = Arc::new(TaskRegistry::new());
    let service = Arc::new(JobService::new(registry.clone(), runner));

    // 5. Start workers
    let eviction_worker = EvictionWorker::new(registry, &settings.registry);
    let eviction_shutdown = eviction_worker.shutdown_token();
    let eviction_handle = eviction_worker.start();

    // 6. Start HTTP server
    let app = routes::routes(service);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    eviction_shutdown.cancel();
    eviction_handle.await?;

    Ok(())
}
