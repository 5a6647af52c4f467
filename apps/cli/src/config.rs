use crate::args::Args;
use config::{Config, Environment, File, Map};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tally_logger::{FileLogConfig, LogConfig};
use tally_voting::VotingConfig;
use tracing::debug;

/// Prefix of environment overrides, e.g. `TALLY__VOTING__MAX_CANDIDATES=16`.
pub const ENV_PREFIX: &str = "TALLY";
const DEFAULT_CONFIG: &str = "tally";

#[tally_derive::tally_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub voting: VotingConfig,
}

impl AppConfig {
    /// Loads the file (if any) and the process environment.
    ///
    /// # Errors
    /// See [`load_config`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        load_config(path, None)
    }

    /// Applies command line overrides on top of the loaded settings.
    #[must_use]
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(level) = &args.log_level {
            self.logging.level.clone_from(level);
        }
        if args.json_logs {
            self.logging.file.get_or_insert_with(FileLogConfig::default).json = true;
        }
        self
    }
}

/// Layered loader: an optional TOML file, then `TALLY__`-prefixed environment variables.
///
/// An explicit `path` must exist. Without one, `tally.toml` in the working
/// directory is used when present. Nested keys use `__` as separator, so
/// `TALLY__LOGGING__LEVEL=debug` sets `logging.level`.
///
/// `env` replaces the process environment as the override source; pass
/// `None` to read the real environment.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or malformed, or if
/// the merged settings do not match `T`.
pub fn load_config<T>(
    path: Option<&Path>,
    env: Option<Map<String, String>>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (effective_path, required) = path
        .map_or_else(|| (PathBuf::from(DEFAULT_CONFIG), false), |p| (p.to_path_buf(), true));

    debug!(path = %effective_path.display(), required, "Loading configuration");

    let config = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
