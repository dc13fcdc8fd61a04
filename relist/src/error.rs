//! Service-level error types
//!
//! Request handling has its own error type, [`ApiError`](crate::handlers::ApiError).
//! This module covers startup paths: configuration, registration, I/O and
//! store connection.

use thiserror::Error;

use crate::query::QueryError;
use crate::store::StoreError;

/// Result type alias for service-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service-level errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Resource registration rejected its configuration
    #[error("Resource registration failed: {0}")]
    Registration(#[from] QueryError),

    /// Store connection or execution error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
