/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Log output: stderr filtered by `RUST_LOG`, plus an optional size-rotated log file.

use crate::config::LoggingConfig;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::fs;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_STDERR_FILTER: &str = "warn,ddb_loader=info";

/// Installs the global subscriber.
///
/// The returned guard flushes the file sink when dropped, so it must be held until the program
/// exits.
pub fn init(config: &LoggingConfig, no_log_file: bool) -> io::Result<Option<WorkerGuard>> {
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_STDERR_FILTER));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    let (file_layer, guard) = match config.file.as_deref().filter(|_| !no_log_file) {
        Some(path) => {
            let file = rotating_file(path, config.max_bytes, config.backups)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(
                    Targets::new()
                        .with_default(Level::WARN)
                        .with_target("ddb_loader", Level::INFO),
                );
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Opens the log file for appending, creating its directory if needed.
///
/// Once the file has grown past `max_bytes` the next write first rotates it: `<file>` becomes
/// `<file>.1`, older backups move up by one and anything past `<file>.<backups>` is deleted.
/// Writes are never split across files.
pub fn rotating_file(
    path: &Path,
    max_bytes: u64,
    backups: usize,
) -> io::Result<FileRotate<AppendCount>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let max_bytes = usize::try_from(max_bytes).unwrap_or(usize::MAX).max(1);
    Ok(FileRotate::new(
        path,
        AppendCount::new(backups.max(1)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}
