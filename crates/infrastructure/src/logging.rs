use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LogLevel};

/// Filter for `level`, unless `RUST_LOG` is set.
///
/// Per-packet decisions log at `debug` in `application`; they stay off
/// unless asked for explicitly, even at a global `debug` level.
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let packet_level = match level {
            LogLevel::Trace => "trace",
            _ => "info",
        };
        EnvFilter::new(format!("{},application={packet_level}", level.as_str()))
    })
}

/// Install the global subscriber.
///
/// - `LogFormat::Json`: flattened JSON lines (log shippers).
/// - `LogFormat::Text`: human-readable pretty output.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(build_filter(level));

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
}
