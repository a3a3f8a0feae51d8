use std::{
    fs, io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs older than this are removed by the cleanup thread.
const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Keeps the non-blocking file writer alive; log lines are lost once this
/// is dropped.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

/// Installs the global subscriber: ANSI console output plus a daily-rolled
/// plain file under `log_dir`, both at `level` unless `RUST_LOG` overrides.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let level = match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        other => {
            eprintln!("invalid log level '{other}', defaulting to 'info'");
            "info"
        }
    };
    let directive: tracing_subscriber::filter::Directive =
        level.parse().context("parsing log level directive")?;
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(directive.clone())
            .parse_lossy(&env)
    };

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .context("creating rolling file appender")?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter()),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_filter(filter()),
        )
        .init();

    spawn_cleanup(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

fn spawn_cleanup(log_dir: PathBuf, prefix: String) {
    thread::spawn(move || loop {
        if let Err(e) = remove_stale_logs(&log_dir, &prefix) {
            tracing::warn!("log cleanup failed: {}", e);
        }
        thread::sleep(CLEANUP_INTERVAL);
    });
}

fn remove_stale_logs(log_dir: &Path, prefix: &str) -> io::Result<()> {
    let now = SystemTime::now();

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(prefix) || !name.ends_with(".log") {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if now.duration_since(modified).unwrap_or_default() > MAX_LOG_AGE {
            fs::remove_file(&path)?;
            tracing::info!("deleted stale log file: {}", name);
        }
    }
    Ok(())
}
