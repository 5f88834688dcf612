// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;
use crate::domain::models::task::TaskStatus;

/// 启动 Prometheus 导出器
///
/// 未启用时不安装任何 recorder，下面的计数调用都是空操作
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    info!("Metrics exporter listening on {}", addr);
}

pub fn task_submitted() {
    counter!("mapscout_tasks_submitted_total").increment(1);
}

pub fn task_finished(status: TaskStatus) {
    counter!("mapscout_tasks_finished_total", "status" => status.to_string()).increment(1);
}

pub fn records_extracted(count: usize) {
    counter!("mapscout_records_extracted_total").increment(count as u64);
}

pub fn checkpoint_written() {
    counter!("mapscout_checkpoint_writes_total").increment(1);
}

pub fn checkpoint_failure() {
    counter!("mapscout_checkpoint_failures_total").increment(1);
}

pub fn navigation_retry() {
    counter!("mapscout_navigation_retries_total").increment(1);
}
