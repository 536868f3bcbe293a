//! Common error types for homeprice

use thiserror::Error;

/// Common result type for homeprice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the homeprice crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A fitted parameter required during replay is absent from the store.
    ///
    /// Fatal for the request: replay must never invent a value, or
    /// predictions would silently diverge from the fitted distribution.
    #[error("Missing fitted parameter '{0}' (store not fitted, or fitted with an older schema)")]
    MissingParameter(String),

    /// Invalid user input or request payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
