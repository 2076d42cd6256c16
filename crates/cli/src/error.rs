//! CLI error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The tool registry could not be assembled.
    #[error("tool registry: {0}")]
    Registry(String),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An error occurred serving the dashboard.
    #[error(transparent)]
    Dashboard(#[from] dashboard::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
