use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt};

pub fn get_log_filename() -> String {
    env::var("LOG_FILE").unwrap_or("output.log".to_owned())
}

/// Logs to stdout and, as json, to the log file. Keep the guard alive for as
/// long as the file should be written to.
pub fn init() -> Result<WorkerGuard, String> {
    let file_appender = tracing_appender::rolling::never("", get_log_filename());
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .finish()
            .with(fmt::Layer::default().json().with_writer(file_writer)),
    )
    .map_err(|err| format!("Unable to set global tracing subscriber: {}", err))?;

    Ok(guard)
}
