// Error types for certwarden
//
// Per-item failures (decode, write, delivery) are collected into run reports;
// query failures abort a run. The crate-wide Result stays anyhow-based and the
// typed variants are recovered with downcast_ref where callers need them.

use std::io;
use thiserror::Error;

/// Main error type for certwarden operations
#[derive(Debug, Error)]
pub enum WardenError {
    /// Stored certificate bytes could not be decoded
    #[error("Failed to decode certificate {serial}: {details}")]
    Decode { serial: String, details: String },

    /// The store rejected a name-set write
    #[error("Failed to write name set for {serial}: {details}")]
    Write { serial: String, details: String },

    /// The store could not answer a query; fatal for the current run
    #[error("Store query failed: {0}")]
    Query(String),

    /// Database connection or schema errors
    #[error("Database error: {0}")]
    Database(String),

    /// Delivering a notice to a recipient failed
    #[error("Failed to notify {recipient}: {details}")]
    Notification { recipient: String, details: String },

    /// Notice template could not be compiled or rendered
    #[error("Template error: {0}")]
    Template(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// A run finished but some items were skipped
    #[error("{failed} out of {total} items failed")]
    PartialFailure { failed: usize, total: usize },

    /// The run was interrupted between batches
    #[error("Run cancelled before completion")]
    Cancelled,

    /// Generic I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Configuration file parsing errors
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WardenError {
    /// Whether this error only affects a single item of a run
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            WardenError::Decode { .. } | WardenError::Write { .. } | WardenError::Notification { .. }
        )
    }
}

impl From<sqlx::Error> for WardenError {
    fn from(err: sqlx::Error) -> Self {
        WardenError::Database(err.to_string())
    }
}

impl From<handlebars::RenderError> for WardenError {
    fn from(err: handlebars::RenderError) -> Self {
        WardenError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for WardenError {
    fn from(err: handlebars::TemplateError) -> Self {
        WardenError::Template(err.to_string())
    }
}

impl From<lettre::address::AddressError> for WardenError {
    fn from(err: lettre::address::AddressError) -> Self {
        WardenError::Config {
            message: format!("Email address error: {}", err),
        }
    }
}
