//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, saving or resolving wxembed configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    // =========================================================================
    // Config file errors
    // =========================================================================
    /// Config file exists but cannot be read
    #[error("cannot read wxembed config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown values
    #[error("invalid wxembed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize wxembed config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write wxembed config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `~/.wxembed` cannot be located
    #[error("no home directory for the global ~/.wxembed config")]
    NoHomeDir,

    // =========================================================================
    // Setting errors
    // =========================================================================
    /// A setting the selected platform needs is unset or empty
    #[error("{key} is not set")]
    MissingSetting { key: &'static str },

    /// A setting has an unusable value
    #[error("{key} {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    /// The environment variable named for a secret holds nothing
    #[error("environment variable '{var}' named by {setting} is not set")]
    SecretEnvMissing { var: String, setting: &'static str },
}

impl ConfigError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    pub fn missing(key: &'static str) -> Self {
        Self::MissingSetting { key }
    }

    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key,
            reason: reason.into(),
        }
    }

    pub fn secret_env_missing(setting: &'static str, var: impl Into<String>) -> Self {
        Self::SecretEnvMissing {
            var: var.into(),
            setting,
        }
    }
}
