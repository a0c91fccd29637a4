//! Logging setup: human-readable stdout plus a plain-text file sink at the
//! configured path, filtered at the configured level. `RUST_LOG` overrides
//! the config when set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use httpmon_core::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber. The returned guard must stay alive for
/// the duration of the process or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard> {
    let log_path = resolve_log_path(config);
    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file_name = log_path
        .file_name()
        .context("log path has no file name")?
        .to_os_string();

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();
    Ok(guard)
}

fn resolve_log_path(config: &AppConfig) -> PathBuf {
    let path = Path::new(&config.log_out_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(&config.working_dir).join(path)
    }
}

/// Map the config vocabulary onto tracing's. `critical` has no direct
/// equivalent and clamps to `error`.
fn level_directive(level: &str) -> &'static str {
    match level {
        "debug" => "debug",
        "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}
