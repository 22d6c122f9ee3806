//! Telemetry setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AppError;

/// Install the global subscriber: stdout (pretty or JSON via `LOG_FORMAT`)
/// plus a daily-rolling file under `logs/`.
///
/// The returned guard must be held for the lifetime of the process so the
/// file writer flushes on exit.
pub fn init_telemetry(default_filter: &str) -> Result<WorkerGuard, AppError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| AppError::TelemetryError(e.to_string()))?;

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("records")
        .filename_suffix("log")
        .build("logs")
        .map_err(|e| AppError::TelemetryError(e.to_string()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stdout).with_target(true))
                .with(fmt::layer().json().with_writer(file_writer).with_target(true))
                .try_init()
                .map_err(|e| AppError::TelemetryError(e.to_string()))?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stdout).with_target(true))
                .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                .try_init()
                .map_err(|e| AppError::TelemetryError(e.to_string()))?;
        }
    }

    Ok(guard)
}
