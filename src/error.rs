//! Error types for tunnelsync

use thiserror::Error;

/// Result type alias for tunnelsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message fragments that mark a command failure as deterministic.
///
/// A failure carrying one of these will fail the same way on every attempt,
/// so the dispatcher re-raises it instead of retrying. Matching ignores case,
/// so "Invalid tunnel ID" and "invalid tunnel id" are both deterministic.
const NON_RETRYABLE_MARKERS: [&str; 3] = ["authentication", "not found", "invalid"];

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The identity check failed; all session-scoped state must be dropped.
    #[error("Session expired. Run `tunnelsync login` to sign in again.")]
    SessionExpired,

    #[error("Prompt error: {0}")]
    Dialoguer(String),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

impl Error {
    /// Whether the dispatcher may try this operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Command(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Failures reported through the command bridge
#[derive(Debug, Error)]
pub enum CommandError {
    /// The backend reported failure, or reported success without a payload.
    #[error("{message}")]
    Failed { command: String, message: String },

    /// The payload was present but did not match the expected shape.
    #[error("Invalid response from '{command}': {message}")]
    InvalidPayload { command: String, message: String },
}

impl CommandError {
    /// Name of the remote command that failed
    pub fn command(&self) -> &str {
        match self {
            CommandError::Failed { command, .. } | CommandError::InvalidPayload { command, .. } => {
                command
            }
        }
    }

    /// Failure message as reported by the backend (or the caller's fallback)
    pub fn message(&self) -> &str {
        match self {
            CommandError::Failed { message, .. } | CommandError::InvalidPayload { message, .. } => {
                message
            }
        }
    }

    /// Transient failures are retried; authentication, not-found and
    /// invalid-input failures are not, and neither are undecodable payloads.
    pub fn is_retryable(&self) -> bool {
        match self {
            CommandError::Failed { message, .. } => {
                let lower = message.to_lowercase();
                !NON_RETRYABLE_MARKERS
                    .iter()
                    .any(|marker| lower.contains(marker))
            }
            CommandError::InvalidPayload { .. } => false,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}. Run `tunnelsync config init` to create one.")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
