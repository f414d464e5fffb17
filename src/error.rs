//! Error types for Outrider.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the external prober and the HTTP probe.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {code:?}")]
    ExitStatus { tool: String, code: Option<i32> },

    #[error("required tool not found on PATH: {0}")]
    ToolMissing(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out")]
    Timeout,
}

/// Result type alias for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors raised while loading the profile document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid config document: {0}")]
    InvalidFormat(String),

    #[error("profile '{0}' not found in config")]
    MissingProfile(String),

    #[error("profile '{name}' is invalid: {reason}")]
    InvalidProfile { name: String, reason: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by the target registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("could not open registry {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed registry: {0}")]
    Csv(#[from] csv::Error),

    #[error("target ID {0} not found in registry")]
    NotFound(String),

    #[error("target ID {0} already exists in registry")]
    DuplicateId(String),

    #[error("failed to persist registry: {0}")]
    Persist(String),

    #[error("registry writer lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Top-level error for command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Port(#[from] crate::types::PortError),

    #[error(transparent)]
    Target(#[from] crate::types::TargetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for command handlers.
pub type CliResult<T> = Result<T, CliError>;
