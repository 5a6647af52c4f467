//! # Logger
//!
//! One place to install the global `tracing` subscriber for Tally binaries.
//!
//! The subscriber is assembled from a [`LogConfig`], which is plain `serde`
//! data so it can live in the application config file:
//!
//! * an [`EnvFilter`] seeded from `level` and `filter`, still overridable
//!   through `RUST_LOG` when no explicit `filter` is set,
//! * an optional compact console layer,
//! * an optional rolling file layer (plain text or JSON) written through a
//!   non-blocking worker.
//!
//! ## Example
//!
//! ```rust
//! use tally_logger::{LogConfig, Logger};
//!
//! let config = LogConfig { level: "debug".into(), ..LogConfig::default() };
//! let _logger = Logger::init("tally-doc", &config).unwrap();
//! tracing::debug!("logger ready");
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_SUFFIX: &str = "log";

/// Logging section of the application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when neither `filter` nor `RUST_LOG` says otherwise.
    pub level: String,
    /// Explicit directives such as `tally_voting=debug,warn`.
    pub filter: Option<String>,
    /// Emit compact, human oriented lines on stderr.
    pub console: bool,
    /// Colorize console output.
    pub ansi: bool,
    /// Also write to rolling files.
    pub file: Option<FileLogConfig>,
}

/// Rolling file output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    pub dir: PathBuf,
    pub rotation: RotationPolicy,
    pub max_files: usize,
    pub json: bool,
}

/// How often a new log file is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<RotationPolicy> for Rotation {
    fn from(policy: RotationPolicy) -> Self {
        match policy {
            RotationPolicy::Minutely => Self::MINUTELY,
            RotationPolicy::Hourly => Self::HOURLY,
            RotationPolicy::Daily => Self::DAILY,
            RotationPolicy::Never => Self::NEVER,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), filter: None, console: true, ansi: true, file: None }
    }
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            rotation: RotationPolicy::Daily,
            max_files: 10,
            json: false,
        }
    }
}

impl LogConfig {
    /// Parses `level` into a [`LevelFilter`].
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for unknown level names.
    pub fn level_filter(&self) -> Result<LevelFilter, LoggerError> {
        LevelFilter::from_str(self.level.trim()).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("Unknown log level '{}': {e}", self.level).into(),
            context: None,
        })
    }

    /// Checks the settings without touching global state.
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] when no output is enabled,
    /// when `max_files` is zero, or when the level or filter cannot be parsed.
    pub fn validate(&self) -> Result<(), LoggerError> {
        if !self.console && self.file.is_none() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging output enabled; enable console or file output".into(),
                context: None,
            });
        }
        if self.file.as_ref().is_some_and(|file| file.max_files == 0) {
            return Err(LoggerError::InvalidConfiguration {
                message: "file.max_files must be greater than zero".into(),
                context: None,
            });
        }
        self.env_filter().map(drop)
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level_filter()?.into());
        match &self.filter {
            Some(filter) => builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid filter '{filter}': {e}").into(),
                context: None,
            }),
            None => Ok(builder.from_env_lossy()),
        }
    }
}

/// Handle to the installed subscriber.
///
/// Holds the file writer's worker guard; dropping the handle flushes and
/// stops file output, so keep it alive for the lifetime of the program.
#[must_use = "Dropping this handle stops background file logging."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Installs the global subscriber described by `config`.
    ///
    /// `name` prefixes rolling file names (`<name>.<date>.log`).
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name or invalid settings.
    /// * [`LoggerError::Internal`] if the log directory cannot be created.
    /// * [`LoggerError::Appender`] if the rolling appender cannot be built.
    /// * [`LoggerError::Subscriber`] if a global subscriber is already set.
    pub fn init(name: &str, config: &LogConfig) -> Result<Self, LoggerError> {
        if name.trim().is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Logger name cannot be empty".into(),
                context: None,
            });
        }
        config.validate()?;

        let mut layers = Vec::new();
        if config.console {
            layers.push(
                fmt::layer().compact().with_ansi(config.ansi).with_writer(std::io::stderr).boxed(),
            );
        }

        let guard = match &config.file {
            Some(file) => {
                fs::create_dir_all(&file.dir).map_err(|e| LoggerError::Internal {
                    message: e.to_string().into(),
                    context: Some(format!("Failed to create {}", file.dir.display()).into()),
                })?;

                let appender = RollingFileAppender::builder()
                    .rotation(file.rotation.into())
                    .filename_prefix(name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(file.max_files)
                    .build(&file.dir)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let layer = fmt::layer().with_writer(writer).with_ansi(false);
                layers.push(if file.json { layer.json().boxed() } else { layer.boxed() });
                Some(guard)
            },
            None => None,
        };

        tracing_subscriber::registry().with(config.env_filter()?).with(layers).try_init()?;

        Ok(Self { guard })
    }

    /// Whether file output (and therefore a worker guard) is active.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::debug!("Logger shutting down, flushing file output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_console_info() {
        let config = LogConfig::default();
        assert!(config.console);
        assert!(config.file.is_none());
        assert_eq!(config.level_filter().unwrap(), LevelFilter::INFO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_config_without_outputs() {
        let config = LogConfig { console: false, ..LogConfig::default() };
        assert!(matches!(config.validate(), Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn rejects_zero_max_files() {
        let config = LogConfig {
            file: Some(FileLogConfig { max_files: 0, ..FileLogConfig::default() }),
            ..LogConfig::default()
        };
        assert!(matches!(config.validate(), Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn rejects_unknown_level() {
        let config = LogConfig { level: "chatty".into(), ..LogConfig::default() };
        assert!(config.level_filter().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_filter() {
        let config = LogConfig { filter: Some("tally=notalevel".into()), ..LogConfig::default() };
        assert!(matches!(config.validate(), Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn deserializes_partial_section() {
        let config: LogConfig = serde_json::from_value(serde_json::json!({
            "level": "warn",
            "file": { "dir": "/tmp/tally", "rotation": "hourly", "json": true }
        }))
        .unwrap();

        assert_eq!(config.level_filter().unwrap(), LevelFilter::WARN);
        assert!(config.console);
        let file = config.file.unwrap();
        assert_eq!(file.rotation, RotationPolicy::Hourly);
        assert_eq!(file.max_files, 10);
        assert!(file.json);
    }

    #[test]
    #[serial]
    fn empty_name_is_rejected_before_install() {
        let err = Logger::init("  ", &LogConfig::default()).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }
}
