//! Error types for the interests migration.

use std::path::PathBuf;

/// Top-level error type. Anything that reaches `main` ends the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Contact API error: {0}")]
    Contact(#[from] ContactError),

    #[error("Outcome log error: {0}")]
    OutcomeLog(#[from] OutcomeLogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Conditions that abort the whole run before or while reading input.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Input file not found or unreadable: {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read input near line {line}: {reason}")]
    InputRead { line: u64, reason: String },
}

/// Errors talking to the contacts API.
///
/// A remote "no such contact" is not an error; these only cover the cases
/// where no usable answer came back.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("Request to {operation} failed: {reason}")]
    Request { operation: String, reason: String },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    /// Throttling or server error still present after the last attempt.
    #[error("{operation} returned HTTP {status}")]
    Unavailable { operation: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors writing the changed/skipped logs.
#[derive(Debug, thiserror::Error)]
pub enum OutcomeLogError {
    #[error("Failed to create log file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write log file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Result type alias for the migration.
pub type Result<T> = std::result::Result<T, Error>;
