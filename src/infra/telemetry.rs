use std::{fs, fs::OpenOptions, sync::Arc};

use tracing::dispatcher;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Install a global tracing subscriber using the provided logging settings.
///
/// A dispatcher installed earlier by the host process is left in place so
/// that embedding and test harnesses can pre-configure their own; a sink
/// that cannot be opened is a hard error.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    if dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.file.as_ref() {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|err| {
                    InfraError::telemetry(format!(
                        "failed to create log directory `{}`: {err}",
                        parent.display()
                    ))
                })?;
            }
            let sink = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| {
                    InfraError::telemetry(format!(
                        "failed to open log sink `{}`: {err}",
                        path.display()
                    ))
                })?;
            let sink = Arc::new(sink);
            match logging.format {
                LogFormat::Json => fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_writer(sink)
                    .boxed(),
                LogFormat::Compact => fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(sink)
                    .boxed(),
            }
        }
        None => match logging.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .boxed(),
            LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
        },
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}
