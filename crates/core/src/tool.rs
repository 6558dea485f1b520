//! Tool invocation types shared by the dispatcher and the orchestration loop.
//!
//! The loop turns each model tool-call request into a [`ToolInvocation`],
//! hands it to the dispatcher together with the [`CallerContext`], and gets
//! back a [`ToolResult`] that is always serializable, never an error.

use serde::{Deserialize, Serialize};

use crate::message::MessageToolCall;

/// A request to execute a tool, as produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Tool wire name, unverified
    pub name: String,

    /// Argument payload as the model produced it; must be parsed before use
    pub raw_arguments: String,

    /// Position of this invocation within its model turn
    pub sequence: usize,
}

impl ToolInvocation {
    /// Build an invocation from an assistant tool call and its position.
    pub fn from_call(call: &MessageToolCall, sequence: usize) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            raw_arguments: call.arguments.clone(),
            sequence,
        }
    }
}

/// The result of one tool execution.
///
/// Success and failure are fed back to the model the same way; `success`
/// is only for logging and events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result answers
    pub call_id: String,

    /// Serialized JSON payload: data, or a structured error object
    pub payload: String,

    /// Whether the tool produced data
    pub success: bool,
}

impl ToolResult {
    /// A successful result carrying `data`.
    pub fn ok(call_id: impl Into<String>, data: &serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            payload: data.to_string(),
            success: true,
        }
    }

    /// A failed result carrying a structured error object.
    pub fn error(call_id: impl Into<String>, error: &serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            payload: error.to_string(),
            success: false,
        }
    }
}

/// Caller-scoped values established by the surface that accepted the
/// request (gateway header, CLI flag). Never derived from model output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Authenticated user id, if the caller is logged in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Preferred locale, e.g. "en-IN"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl CallerContext {
    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A caller authenticated as `user_id`.
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            locale: None,
        }
    }

    /// Set the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// The user id, ignoring blank values.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}
