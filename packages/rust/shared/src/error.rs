//! Error types for ResearchKit.
//!
//! Library crates use [`ResearchError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ResearchKit operations.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// Caller-supplied input was rejected (empty topic, bullet count out of range).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The API key environment variable is unset or empty.
    #[error("missing credential: set the {var} environment variable")]
    MissingCredential { var: String },

    /// Network, auth, or protocol failure from the LLM provider.
    #[error("external service error: {message}")]
    ExternalService {
        /// HTTP status, when the provider answered at all.
        status: Option<u16>,
        message: String,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ResearchError>;

impl ResearchError {
    /// Create an invalid-input error from any displayable message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Create a missing-credential error naming the env var.
    pub fn missing_credential(var: impl Into<String>) -> Self {
        Self::MissingCredential { var: var.into() }
    }

    /// External-service failure without an HTTP status (transport, decode).
    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService {
            status: None,
            message: msg.into(),
        }
    }

    /// External-service failure carrying the HTTP status code.
    pub fn external_status(status: u16, msg: impl Into<String>) -> Self {
        Self::ExternalService {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ResearchError::invalid_input("topic must not be empty");
        assert_eq!(err.to_string(), "invalid input: topic must not be empty");

        let err = ResearchError::missing_credential("OPENAI_API_KEY");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn external_status_is_kept() {
        let err = ResearchError::external_status(401, "HTTP 401: bad key");
        match err {
            ResearchError::ExternalService { status, message } => {
                assert_eq!(status, Some(401));
                assert!(message.contains("bad key"));
            }
            other => panic!("expected ExternalService, got {other:?}"),
        }
    }
}
