use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;

pub const DEFAULT_LOG_FILTER: &str = "info,scatterlane_core=trace";

/// Keeps the JSON log writer flushing until dropped.
pub struct TelemetryGuard {
    pub run_id: Uuid,
    pub log_path: PathBuf,
    _file_guard: WorkerGuard,
}

pub fn init_tracing(log_dir: impl AsRef<Path>) -> anyhow::Result<TelemetryGuard> {
    init_tracing_with_config(log_dir, &DiagnosticsConfig::default())
}

/// Installs the global subscriber: `RUST_LOG` or the configured filter, an
/// optional compact console layer on stderr and a JSON file per run.
pub fn init_tracing_with_config(
    log_dir: impl AsRef<Path>,
    config: &DiagnosticsConfig,
) -> anyhow::Result<TelemetryGuard> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let run_id = Uuid::new_v4();
    let file_name = log_file_name(&config.trace_file_prefix, run_id);
    let log_path = log_dir.join(&file_name);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, file_name));

    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer);

    let installed = tracing_subscriber::registry()
        .with(env_filter(&config.rust_log_filter))
        .with(console_layer)
        .with(file_layer)
        .try_init();
    match installed {
        Ok(()) => info!(%run_id, path = %log_path.display(), "tracing initialized"),
        Err(error) => warn!(?error, "global tracing subscriber already initialized"),
    }

    Ok(TelemetryGuard {
        run_id,
        log_path,
        _file_guard: file_guard,
    })
}

fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn log_file_name(prefix: &str, run_id: Uuid) -> String {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let short_id = run_id.simple().to_string();
    format!("{prefix}-{timestamp}-{}.jsonl", &short_id[..8])
}
