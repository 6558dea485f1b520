//! Classified failures of an orchestration run.

use hydra_core::error::{ProviderError, StoreError};
use thiserror::Error;

use crate::validator::ValidationError;

/// Why a run produced no response.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("provider rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("completion timed out: {0}")]
    CompletionTimeout(String),

    #[error("provider authentication failed: {0}")]
    ProviderAuth(String),

    #[error("provider failure: {0}")]
    Provider(ProviderError),

    #[error("invalid model response: {0}")]
    InvalidResponse(#[from] ValidationError),

    #[error("no valid response after {iterations} iterations: {source}")]
    IterationsExhausted {
        iterations: usize,
        source: ValidationError,
    },

    #[error("conversation store failure: {0}")]
    Store(#[from] StoreError),

    #[error("run cancelled")]
    Cancelled,
}

/// How callers should treat a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Try again later
    TransientExternal,
    /// Retrying will not help
    FatalExternal,
    /// The model's final output was unusable
    TerminalValidation,
    /// The loop ran out of iterations without a usable output
    IterationExhausted,
    /// History could not be loaded or the exchange not persisted
    Storage,
    /// The caller went away
    Cancelled,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransientExternal => "transient_external",
            Self::FatalExternal => "fatal_external",
            Self::TerminalValidation => "terminal_validation",
            Self::IterationExhausted => "iteration_exhausted",
            Self::Storage => "storage",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<ProviderError> for RunError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { retry_after_secs } => Self::RateLimited { retry_after_secs },
            ProviderError::Timeout(msg) => Self::CompletionTimeout(msg),
            ProviderError::AuthenticationFailed(msg) => Self::ProviderAuth(msg),
            other => Self::Provider(other),
        }
    }
}

impl RunError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited { .. } | Self::CompletionTimeout(_) => ErrorClass::TransientExternal,
            Self::ProviderAuth(_) | Self::Provider(_) => ErrorClass::FatalExternal,
            Self::InvalidResponse(_) => ErrorClass::TerminalValidation,
            Self::IterationsExhausted { .. } => ErrorClass::IterationExhausted,
            Self::Store(_) => ErrorClass::Storage,
            Self::Cancelled => ErrorClass::Cancelled,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::TransientExternal
    }

    /// Short text that is safe to show the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "AI service is currently rate limited. Please try again in a moment.",
            Self::CompletionTimeout(_) => "AI service request timed out. Please try again.",
            Self::ProviderAuth(_) => "AI service authentication failed. Please contact support.",
            Self::Provider(_) | Self::Store(_) => "Failed to generate AI response. Please try again later.",
            Self::InvalidResponse(_) => "AI responded with invalid data. Please rephrase your question and try again.",
            Self::IterationsExhausted { .. } => {
                "Sorry, I couldn't complete that request. Please try again with a more specific question."
            }
            Self::Cancelled => "The request was cancelled.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_are_classified() {
        let cases = [
            (ProviderError::RateLimited { retry_after_secs: 5 }, ErrorClass::TransientExternal),
            (ProviderError::Timeout("60s".into()), ErrorClass::TransientExternal),
            (ProviderError::AuthenticationFailed("bad key".into()), ErrorClass::FatalExternal),
            (
                ProviderError::ApiError { status_code: 500, message: "boom".into() },
                ErrorClass::FatalExternal,
            ),
            (ProviderError::Network("reset".into()), ErrorClass::FatalExternal),
        ];
        for (err, class) in cases {
            assert_eq!(RunError::from(err).class(), class);
        }
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(RunError::RateLimited { retry_after_secs: 1 }.is_retryable());
        assert!(!RunError::ProviderAuth("x".into()).is_retryable());
        assert!(!RunError::InvalidResponse(ValidationError::NotAnObject).is_retryable());
    }

    #[test]
    fn user_messages_hide_internals() {
        let err = RunError::ProviderAuth("sk-live-1234 rejected".into());
        assert!(!err.user_message().contains("sk-live"));
        let err = RunError::InvalidResponse(ValidationError::NotJson("expected value at line 1".into()));
        assert!(err.user_message().contains("rephrase"));
    }
}
