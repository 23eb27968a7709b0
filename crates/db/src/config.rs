use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single-user desktop install.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file (default: `formstore.db`).
    pub database_path: PathBuf,
    /// Pool size (default: `4`).
    pub max_connections: u32,
    /// How long a writer waits for the file lock (default: 5 seconds).
    pub busy_timeout: Duration,
    /// Reject dangling references and deletes of referenced rows
    /// (default: `false`).
    pub enforce_foreign_keys: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("formstore.db"),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            enforce_foreign_keys: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration for the database file at `path`.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            database_path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default        |
    /// |-------------------------------|----------------|
    /// | `FORMSTORE_DATABASE`          | `formstore.db` |
    /// | `FORMSTORE_MAX_CONNECTIONS`   | `4`            |
    /// | `FORMSTORE_BUSY_TIMEOUT_SECS` | `5`            |
    /// | `FORMSTORE_ENFORCE_FK`        | `false`        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_path = lookup("FORMSTORE_DATABASE")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let max_connections = match lookup("FORMSTORE_MAX_CONNECTIONS") {
            Some(raw) => parse_number("FORMSTORE_MAX_CONNECTIONS", &raw)?,
            None => defaults.max_connections,
        };
        if max_connections == 0 {
            return Err(ConfigError {
                var: "FORMSTORE_MAX_CONNECTIONS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let busy_timeout = match lookup("FORMSTORE_BUSY_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("FORMSTORE_BUSY_TIMEOUT_SECS", &raw)?),
            None => defaults.busy_timeout,
        };

        let enforce_foreign_keys = match lookup("FORMSTORE_ENFORCE_FK") {
            Some(raw) => parse_bool("FORMSTORE_ENFORCE_FK", &raw)?,
            None => defaults.enforce_foreign_keys,
        };

        Ok(Self {
            database_path,
            max_connections,
            busy_timeout,
            enforce_foreign_keys,
        })
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            value: raw.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}
