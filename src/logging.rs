//! Diagnostic logging for the `cmk` binary.
//!
//! Logs go to stderr so CSV on stdout stays clean. `RUST_LOG` picks the
//! level and `CMK_LOG_FORMAT` switches between human and JSON lines.

use std::env;
use std::io;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FORMAT_ENV: &str = "CMK_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported CMK_LOG_FORMAT `{0}`; expected `human` or `json`")]
pub struct UnsupportedLogFormat(pub String);

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = UnsupportedLogFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" | "" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(UnsupportedLogFormat(other.to_string())),
        }
    }
}

impl LogFormat {
    /// The format named by `CMK_LOG_FORMAT`, human when unset.
    pub fn from_env() -> Result<Self, UnsupportedLogFormat> {
        match env::var_os(LOG_FORMAT_ENV) {
            Some(raw) => raw.to_string_lossy().parse(),
            None => Ok(LogFormat::Human),
        }
    }
}

/// Install the stderr subscriber. Returns false if a global subscriber was
/// already set, in which case that one stays in place.
///
/// Without `RUST_LOG` only warnings are shown, or debug events when
/// `verbose` is set.
pub fn init_logging(verbose: bool, format: LogFormat) -> bool {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    let layer = match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Human => layer.without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("human", LogFormat::Human)]
    #[case("", LogFormat::Human)]
    #[case(" JSON ", LogFormat::Json)]
    fn accepted_formats(#[case] raw: &str, #[case] expected: LogFormat) {
        assert_eq!(raw.parse::<LogFormat>().unwrap(), expected);
    }

    #[test]
    fn unknown_format() {
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert_eq!(err, UnsupportedLogFormat("xml".to_string()));
        assert_eq!(
            err.to_string(),
            "unsupported CMK_LOG_FORMAT `xml`; expected `human` or `json`"
        );
    }

    #[test]
    fn second_install_keeps_the_first() {
        init_logging(false, LogFormat::Human);
        assert!(!init_logging(true, LogFormat::Json));
    }
}
