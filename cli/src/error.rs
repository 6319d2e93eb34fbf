//! Error types for the CLI

use thiserror::Error;

use crate::config::ConfigError;
use tabula_migrations::MigrationError;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Migration engine error
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Could not reach the database
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Malformed desired-columns file
    #[error("Invalid column set in {path}: {message}")]
    InvalidColumnSet { path: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}
