//! Runtime error types.

use herald_framework::{CatalogError, DispatchError};
use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The command catalog failed validation.
    #[error("Invalid command catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    /// Registering a shutdown signal handler failed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
