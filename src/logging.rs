//! Tracing subscriber setup.
//!
//! The terminal belongs to the UI, so logs go to a file. Filter priority:
//! `GIFGRID_LOG`, then `RUST_LOG`, then the configured `log.level`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "GIFGRID_LOG";
const LOG_FILE_NAME: &str = "gifgrid.log";

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("gifgrid").join(LOG_FILE_NAME))
}

/// Installs the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(cfg: &LogConfig) -> Result<Option<WorkerGuard>> {
    let Some(path) = cfg.file.clone().or_else(default_log_path) else {
        return Ok(None);
    };
    let (dir, file_name) = split_path(&path);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("logging: create directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(&cfg.level))
        .with(layer)
        .try_init()
        .context("logging: install subscriber")?;

    Ok(Some(guard))
}

fn split_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| LOG_FILE_NAME.to_string());
    (dir, file_name)
}

fn build_filter(level: &str) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(format!("gifgrid={level}")).unwrap_or_else(|_| EnvFilter::new("gifgrid=info"))
}
