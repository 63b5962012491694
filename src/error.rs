//! Error types for voxlink.

use thiserror::Error;

/// Primary error type for all voxlink operations.
#[derive(Error, Debug)]
pub enum VoxlinkError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No such tool invocation: {0}")]
    UnknownToolCall(String),

    #[error("Service error: {message}")]
    Service {
        code: Option<String>,
        message: String,
    },
}

impl VoxlinkError {
    /// Whether a retry of the failed operation could plausibly succeed.
    ///
    /// Configuration, authentication, and state errors need caller
    /// intervention first; transport-level failures do not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VoxlinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(VoxlinkError::Transport("reset".into()).is_retryable());
        assert!(!VoxlinkError::Authentication("missing key".into()).is_retryable());
        assert!(!VoxlinkError::UnknownToolCall("c1".into()).is_retryable());
    }
}
