//! Error types for the Parlance domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The top-level taxonomy
//! mirrors how faults surface at the HTTP boundary: validation, not-found,
//! configuration, storage, timeout, and everything else. Each collaborator
//! boundary (provider, tool) has its own error type that folds in via `#[from]`.

use thiserror::Error;

/// The top-level error type for all Parlance operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad request shape or content — empty message, malformed parameters.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A named thing (tool, history file) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The agent cannot be constructed because of bad credentials/config.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The history store failed underneath us.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Agent construction failed for a reason other than configuration.
    #[error("Initialization error: {0}")]
    Init(String),

    /// A turn exceeded its time budget.
    #[error("Turn timed out after {0}s")]
    Timeout(u64),

    // --- Collaborator boundaries ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {function} — {reason}")]
    ExecutionFailed { function: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_message() {
        let err = Error::Validation("message must not be empty".into());
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn provider_error_folds_into_top_level() {
        let err: Error = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        }
        .into();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_carries_function_name() {
        let err = ToolError::ExecutionFailed {
            function: "calculate".into(),
            reason: "division by zero".into(),
        };
        assert!(err.to_string().contains("calculate"));
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn timeout_display_includes_seconds() {
        assert_eq!(Error::Timeout(300).to_string(), "Turn timed out after 300s");
    }
}
