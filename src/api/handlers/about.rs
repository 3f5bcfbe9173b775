//! Liveness and diagnostics handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use crate::api::ApiState;
use crate::socket_server::host::local_hostname;

/// Diagnostics shown in the about screen.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutResponse {
    pub version: String,
    pub database_version: Option<String>,
    pub hostname: Option<String>,
    pub arch: String,
    /// e.g. `8x Intel(R) Core(TM) i7`
    pub cpus: String,
    pub platform: String,
    pub release: Option<String>,
}

pub async fn heartbeat() -> &'static str {
    "OK"
}

fn describe_cpus() -> String {
    let system = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
    let cpus = system.cpus();
    let model = cpus.first().map(|cpu| cpu.brand().trim()).unwrap_or("unknown");
    format!("{}x {}", cpus.len(), model)
}

pub async fn about(State(state): State<Arc<ApiState>>) -> Json<AboutResponse> {
    let cpus = tokio::task::spawn_blocking(describe_cpus)
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    Json(AboutResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        database_version: state.corpus.version(),
        hostname: local_hostname(),
        arch: std::env::consts::ARCH.to_string(),
        cpus,
        platform: std::env::consts::OS.to_string(),
        release: System::kernel_version(),
    })
}
