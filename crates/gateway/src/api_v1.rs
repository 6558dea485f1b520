//! `/v1` routes: chat, conversation history, and the tool catalog.
//!
//! Success bodies are `{"success": true, "data": ...}`. Failures are
//! `{"success": false, "error": "<user-safe text>", "retryable": bool}`;
//! internal details only go to the logs.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use hydra_agent::{ErrorClass, RunError};
use hydra_core::error::StoreError;
use hydra_core::provider::ToolDefinition;
use hydra_core::response::StructuredResponse;
use hydra_core::store::{ConversationId, ConversationSummary, StoredTurn};
use hydra_core::tool::CallerContext;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::SharedState;

/// Longest accepted chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Header carrying the authenticated user id, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

const DEFAULT_MESSAGES_LIMIT: usize = 50;
const MAX_MESSAGES_LIMIT: usize = 200;

// --- Envelopes ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            conversation_id: None,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: String,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
}

/// Errors returned by the v1 handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("too many requests, retry after {retry_after_secs}s")]
    TooManyRequests { retry_after_secs: u64 },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Run(err) => match err {
                RunError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                RunError::CompletionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                RunError::Provider(_) | RunError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
                RunError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                RunError::ProviderAuth(_) | RunError::IterationsExhausted { .. } | RunError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, retryable, retry_after_seconds) = match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => (msg.clone(), false, None),
            Self::TooManyRequests { retry_after_secs } => (
                "Too many requests, please try again later.".to_string(),
                true,
                Some(*retry_after_secs),
            ),
            Self::Store(_) => ("Something went wrong. Please try again later.".to_string(), false, None),
            Self::Run(err) => {
                let retry_after = match err {
                    RunError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
                    _ => None,
                };
                (err.user_message().to_string(), err.is_retryable(), retry_after)
            }
        };
        ErrorBody {
            success: false,
            error,
            retryable,
            retry_after_seconds,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Run(err) if err.class() != ErrorClass::Cancelled => {
                warn!(class = err.class().as_str(), "Chat request failed: {err}");
            }
            Self::Store(err) => warn!("Store failure: {err}"),
            _ => {}
        }
        (self.status(), Json(self.body())).into_response()
    }
}

/// Caller identity and locale from request headers.
pub fn caller_from_headers(headers: &HeaderMap) -> CallerContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let mut caller = match header(USER_ID_HEADER) {
        Some(id) => CallerContext::authenticated(id),
        None => CallerContext::anonymous(),
    };
    if let Some(lang) = header("accept-language") {
        let first = lang.split([',', ';']).next().unwrap_or_default().trim();
        if !first.is_empty() && first != "*" {
            caller = caller.with_locale(first);
        }
    }
    caller
}

// --- Chat ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub text: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// `POST /v1/chat`
pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<Envelope<StructuredResponse>>, ApiError> {
    let text = payload.text.trim();
    let chars = text.chars().count();
    if chars == 0 {
        return Err(ApiError::BadRequest("Message text is required".into()));
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message is too long ({chars} characters, at most {MAX_MESSAGE_CHARS})"
        )));
    }

    let caller = caller_from_headers(&headers);
    let requested = payload
        .conversation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let conversation_id = match requested {
        Some(id) => {
            let id = ConversationId::from(id);
            if !state.conversations.conversation_exists(&id).await? {
                return Err(ApiError::NotFound("Conversation not found".into()));
            }
            id
        }
        None => state.conversations.create_conversation(caller.user_id()).await?,
    };

    info!(conversation_id = %conversation_id, chars, "v1/chat request");
    let outcome = state.agent.process(&conversation_id, text, &caller).await?;

    Ok(Json(Envelope {
        success: true,
        data: outcome.response,
        conversation_id: Some(conversation_id),
    }))
}

// --- Conversations ---

/// `GET /v1/conversations`: the caller's conversations, empty when anonymous.
pub async fn list_conversations_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Vec<ConversationSummary>>>, ApiError> {
    let caller = caller_from_headers(&headers);
    let conversations = match caller.user_id() {
        Some(user_id) => state.conversations.list_conversations(user_id).await?,
        None => Vec::new(),
    };
    Ok(Envelope::ok(conversations))
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
}

/// `GET /v1/conversations/{id}/messages`
pub async fn messages_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Envelope<Vec<StoredTurn>>>, ApiError> {
    let id = ConversationId::from(id.as_str());
    if !state.conversations.conversation_exists(&id).await? {
        return Err(ApiError::NotFound("Conversation not found".into()));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MESSAGES_LIMIT)
        .clamp(1, MAX_MESSAGES_LIMIT);
    let turns = state.conversations.load_recent_turns(&id, limit).await?;
    Ok(Envelope::ok(turns))
}

// --- Tools ---

/// `GET /v1/tools`
pub async fn tools_handler() -> Json<Envelope<Vec<ToolDefinition>>> {
    Envelope::ok(hydra_tools::tool_definitions())
}
