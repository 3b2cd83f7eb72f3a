//! Logging setup with console output and optional rolling file output.

use std::path::PathBuf;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "stratus_core=info,tower_http=warn";

/// Timer that formats timestamps in the server's local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Initialize the tracing subscriber.
///
/// Console output is always enabled. When `log_dir` is set, a daily
/// rotating file appender is added as well; the returned guard must stay
/// alive for the lifetime of the process or buffered file output is lost.
///
/// `RUST_LOG` overrides the default filter when set.
pub fn init_logging(log_dir: Option<&str>) -> crate::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_layer = fmt::layer().with_ansi(true).with_timer(LocalTimer);

    match log_dir {
        Some(dir) => {
            let log_path = PathBuf::from(dir);
            std::fs::create_dir_all(&log_path).map_err(|e| {
                crate::Error::config(format!(
                    "failed to create log directory {}: {e}",
                    log_path.display()
                ))
            })?;

            let file_appender = tracing_appender::rolling::daily(&log_path, "stratus-core.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_timer(LocalTimer),
                )
                .try_init()
                .map_err(|e| crate::Error::config(format!("failed to init logging: {e}")))?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init()
                .map_err(|e| crate::Error::config(format!("failed to init logging: {e}")))?;

            Ok(None)
        }
    }
}
