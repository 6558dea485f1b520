//! Error types for the Hydra domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for Hydra operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the completion provider.
///
/// The orchestration loop treats `RateLimited` and `Timeout` as transient
/// and everything else as fatal.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures produced while running a single tool.
///
/// None of these ever escape the dispatcher: each is rendered into a
/// structured payload with [`ToolError::to_payload`] and handed back to the
/// model as a tool result.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing identity: {0}")]
    MissingIdentity(String),

    #[error("{resource} not found: {reference}")]
    NotFound { resource: String, reference: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

impl ToolError {
    /// Stable machine-readable kind, used as the `error` field of the payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::MissingIdentity(_) => "missing_identity",
            Self::NotFound { .. } => "not_found",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// A hint for the model on how to recover.
    fn hint(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "Use one of the tools listed in the tool catalog.",
            Self::InvalidArguments(_) => "Invalid tool arguments, please fix them and try again.",
            Self::MissingIdentity(_) => {
                "The user is not logged in. Do not call this tool again; offer general help or ask them to log in."
            }
            Self::NotFound { .. } => {
                "Nothing matched. Ask the user to double-check the identifier or narrow the request."
            }
            Self::ExecutionFailed { .. } | Self::Timeout { .. } => {
                "Tool execution failed, you may try again once or ask the user to retry later."
            }
        }
    }

    /// Render this error as the JSON object the model sees.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
            "hint": self.hint(),
        })
    }
}

/// Failures of the conversation store or a tool backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 502,
            message: "Bad gateway".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad gateway"));
    }

    #[test]
    fn tool_error_payload_is_structured() {
        let err = ToolError::NotFound {
            resource: "Order".into(),
            reference: "22C56AE4".into(),
        };
        let payload = err.to_payload();
        assert_eq!(payload["error"], "not_found");
        assert!(payload["message"].as_str().unwrap().contains("22C56AE4"));
        assert!(payload["hint"].is_string());
    }

    #[test]
    fn tool_error_kinds_are_distinct() {
        let kinds = [
            ToolError::UnknownTool("x".into()).kind(),
            ToolError::InvalidArguments("x".into()).kind(),
            ToolError::MissingIdentity("x".into()).kind(),
            ToolError::Timeout { tool_name: "x".into(), timeout_secs: 1 }.kind(),
        ];
        let mut dedup = kinds.to_vec();
        dedup.dedup();
        assert_eq!(dedup.len(), kinds.len());
    }
}
