//! Structured Logger
//!
//! Wraps `tracing` with a console layer, a daily-rolling NDJSON file and
//! environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global structured logger.
///
/// `RUST_LOG` wins over `level` when set. Without a `log_dir` only the console
/// layer is installed, as is the case when the directory cannot be opened.
/// Calling this twice is harmless.
pub fn init_logger(log_dir: Option<&Path>, level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    // Rolling file appender: writes NDJSON to `<dir>/regionhop.log.YYYY-MM-DD`
    let file_layer = log_dir.and_then(|dir| {
        match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("regionhop.log")
            .build(dir)
        {
            Ok(appender) => Some(fmt::layer().json().with_writer(appender).with_ansi(false)),
            Err(e) => {
                eprintln!("regionhop: file logging disabled, cannot open {}: {e}", dir.display());
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
