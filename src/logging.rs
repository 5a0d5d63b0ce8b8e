//! ログ初期化とログファイル管理

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogConfig;

/// ログファイル名の接頭辞（日付サフィックスはtracing-appenderが付与）
pub const LOG_FILE_PREFIX: &str = "voiceup.log";

/// ログ初期化
///
/// `RUST_LOG`が設定されていればそちらを優先する。ファイル出力を有効にした場合は
/// 返されたガードを終了まで保持すること。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;

    let mut guard = None;
    let file_layer = if config.enable_file_logging {
        let log_dir = resolve_log_dir(config)?;
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        if config.auto_cleanup_enabled {
            cleanup_old_logs(&log_dir, config.max_log_files as usize)?;
        }

        let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_timer(LocalTime::rfc_3339());

        Some(if config.json_format {
            layer.json().boxed()
        } else {
            layer.boxed()
        })
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()?;

    Ok(guard)
}

/// ログディレクトリを決定
pub fn resolve_log_dir(config: &LogConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.log_dir {
        return Ok(dir.clone());
    }

    let project_dirs = ProjectDirs::from("dev", "sifyfy", "voiceup")
        .context("Failed to get project directories")?;
    Ok(project_dirs.data_dir().join("logs"))
}

/// 古いログファイルを削除して`max_files`件以下に保つ
///
/// ファイル名の日付サフィックス順で古いものから削除する。削除した件数を返す。
pub fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> Result<usize> {
    let pattern = log_dir.join(format!("{}*", LOG_FILE_PREFIX));
    let pattern = pattern.to_string_lossy();

    let mut log_files: Vec<PathBuf> = glob::glob(&pattern)
        .context("Invalid log file pattern")?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    if log_files.len() <= max_files {
        return Ok(0);
    }

    log_files.sort();
    let excess = log_files.len() - max_files;
    let mut removed = 0;
    for path in log_files.into_iter().take(excess) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("ログファイルの削除に失敗: {} ({})", path.display(), e),
        }
    }

    if removed > 0 {
        tracing::debug!("🧹 Removed {} old log files", removed);
    }
    Ok(removed)
}
