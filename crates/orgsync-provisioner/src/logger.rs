use serde::Deserialize;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

const DEFAULT_FILTER: &str = "info";

#[derive(Deserialize, Debug, Default)]
pub(super) struct LoggerConfig {
    #[serde(default)]
    pub format: LoggerFormat,
    /// `RUST_LOG` style directives. `RUST_LOG` itself is used when unset.
    pub filter: Option<String>,
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum LoggerFormat {
    #[default]
    Json,
    Pretty,
}

pub(super) fn init_logger(config: &LoggerConfig) {
    let filter = match config.filter.as_deref() {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };
    let builder = SubscriberBuilder::default().with_env_filter(filter);

    match config.format {
        LoggerFormat::Json => builder.json().init(),
        LoggerFormat::Pretty => builder.pretty().init(),
    }
}
