//! Environment-backed configuration snapshots
//!
//! [`EnvSnapshot`] captures a point-in-time view of configuration values.
//! Values from an optional `.env` file are loaded first and the process
//! environment overrides them, so deployments can always win over files.
//! A snapshot never changes after it is built; reloading means building a
//! new one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building or reading a snapshot
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `.env` file exists but could not be parsed
    #[error("Failed to read env file '{path}': {detail}")]
    EnvFile { path: PathBuf, detail: String },

    /// A value is present but cannot be parsed into the expected type
    #[error("Invalid value '{value}' for {key}: {detail}")]
    InvalidValue {
        key: String,
        value: String,
        detail: String,
    },
}

/// Immutable key-value view of configuration sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    values: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            values: std::env::vars().collect(),
        }
    }

    /// Build a snapshot from explicit pairs (mostly useful in tests)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load the `.env` file (if it exists) and overlay the process environment
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut snapshot = match env_file {
            Some(path) if path.exists() => Self::read_env_file(path)?,
            _ => Self::new(),
        };
        snapshot.values.extend(std::env::vars());
        Ok(snapshot)
    }

    /// Read only the given `.env` file, without the process environment
    pub fn read_env_file(path: &Path) -> Result<Self, ConfigError> {
        let to_error = |detail: String| ConfigError::EnvFile {
            path: path.to_path_buf(),
            detail,
        };

        let iter = dotenvy::from_path_iter(path).map_err(|e| to_error(e.to_string()))?;
        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| to_error(e.to_string()))?;
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Return a copy with one value set (overrides existing values)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a value; blank values count as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Get a value or the given default
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Parse a value into `T`, returning `None` when unset
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    detail: e.to_string(),
                })
            })
            .transpose()
    }

    /// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`)
    pub fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    detail: "expected a boolean".to_string(),
                }),
            })
            .transpose()
    }

    /// Check whether a non-blank value is present
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of captured keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
