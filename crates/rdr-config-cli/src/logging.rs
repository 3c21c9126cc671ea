use std::path::PathBuf;

use snafu::{ResultExt, Snafu};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{InitError, RollingFileAppender};
use tracing_subscriber::{
    EnvFilter, Registry,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender { source: InitError },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: TryInitError },
}

/// Initializes `tracing` logging with options from the environment variable `env`.
///
/// The maximum log level defaults to INFO. Logs are written to stderr, stdout carries the
/// rendered documents.
///
/// Log output can be copied to a file by setting `{env}_DIRECTORY` (e.g.
/// `RDR_CONFIG_LOG_DIRECTORY`) to a directory path. This file will be rotated regularly.
pub fn initialize_logging(env: &str, app_name: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_env_var(env)
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let file_appender_directory = std::env::var_os(format!("{env}_DIRECTORY")).map(PathBuf::from);
    let file_appender = file_appender_directory
        .as_deref()
        .map(|log_dir| {
            RollingFileAppender::builder()
                .filename_suffix(format!("{app_name}.log"))
                .max_log_files(6)
                .build(log_dir)
        })
        .transpose()
        .context(InitRollingFileAppenderSnafu)?;

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = file_appender.map(|file_appender| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender)
    });
    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context(SetGlobalDefaultSubscriberSnafu)?;

    // need to delay logging until after tracing is initialized
    match file_appender_directory {
        Some(dir) => tracing::info!(directory = %dir.display(), "file logging enabled"),
        None => tracing::debug!("file logging disabled, because no log directory set"),
    }
    Ok(())
}
