//! Tracing setup shared by the server and the `group-posts` CLI.
//!
//! Pipeline events carry a `stage` field (`embedding`, `clustering`, `done`) and provider
//! retries log the attempt number, so `RUST_LOG=news_grouper=debug` is usually enough to see
//! where a request spent its time. Console output goes to stderr, which keeps the CLI's JSON
//! on stdout clean. A second, plain-text copy is appended to `NEWS_GROUPER_LOG_FILE`, or to
//! `logs/news-grouper.log` when that is unset.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "NEWS_GROUPER_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_NAME: &str = "news-grouper.log";
/// Crate events at `info`, dependencies (reqwest, hyper) only when they warn.
const DEFAULT_FILTER: &str = "warn,news_grouper=info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Call once, after configuration is loaded.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match open_log_file(&log_file_path()) {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false);
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// File that receives the plain-text log copy.
fn log_file_path() -> PathBuf {
    std::env::var_os(LOG_FILE_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_NAME))
}

/// Open `path` for appending behind a non-blocking writer, creating its directory if needed.
///
/// Failure only costs the file copy; console logging still works.
fn open_log_file(path: &Path) -> Option<NonBlocking> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("news-grouper: cannot create log directory {}: {err}", dir.display());
            return None;
        }
    }
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("news-grouper: cannot open log file {}: {err}", path.display());
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}
