//! Console and log file output.
//!
//! The console carries bare progress messages; the log file in the working
//! directory gets timestamped `LEVEL message` lines. Without `--debug` the
//! console shows info and up while the file only records warnings and
//! errors; with it, both receive debug detail.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*};

pub const LOG_FILE: &str = "lighthouse-keeper.log";

/// Initialize logging once, before any device traffic.
///
/// The returned guard must stay alive for the whole process or buffered
/// file output is lost.
pub fn init(debug: bool) -> WorkerGuard {
    let console_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let file_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_filter(console_level);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(file_level);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
