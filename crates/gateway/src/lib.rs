//! HTTP API gateway for Hydra.
//!
//! Exposes the support agent over REST: chat, conversation history, the
//! tool catalog, and a health check. Caller identity arrives in the
//! `x-user-id` header from the upstream auth layer.
//!
//! Built on Axum.

pub mod api_v1;
pub mod rate_limit;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use hydra_agent::SupportAgent;
use hydra_config::AppConfig;
use hydra_core::catalog::{OrderStore, ProductCatalog, ProfileStore};
use hydra_core::error::StoreError;
use hydra_core::event::EventBus;
use hydra_core::provider::Provider;
use hydra_core::store::ConversationStore;
use hydra_store::{CatalogWriter, InMemoryStore, SqliteStore, StaticKnowledge, seed_demo_data};

pub use api_v1::ApiError;
pub use rate_limit::{RateDecision, RateLimiter};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<SupportAgent>,
    pub conversations: Arc<dyn ConversationStore>,
    pub limiter: RateLimiter,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(agent: Arc<SupportAgent>, conversations: Arc<dyn ConversationStore>, limiter: RateLimiter) -> Self {
        Self {
            agent,
            conversations,
            limiter,
        }
    }
}

/// Failures while starting the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no completion provider configured; set HYDRA_API_KEY or OPENAI_API_KEY")]
    NoProvider,

    #[error("unknown store backend `{0}`")]
    UnknownBackend(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the router with all gateway routes.
///
/// `/v1/chat` is rate limited per caller; `/health` is not.
pub fn build_router(state: SharedState) -> Router {
    let chat = Router::new()
        .route("/v1/chat", post(api_v1::chat_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/conversations", get(api_v1::list_conversations_handler))
        .route("/v1/conversations/{id}/messages", get(api_v1::messages_handler))
        .route("/v1/tools", get(api_v1::tools_handler))
        .merge(chat)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Assemble gateway state over one store.
pub fn build_state<S>(config: &AppConfig, provider: Arc<dyn Provider>, store: Arc<S>, event_bus: Arc<EventBus>) -> SharedState
where
    S: ConversationStore + ProductCatalog + OrderStore + ProfileStore + 'static,
{
    let agent = SupportAgent::from_config(config, provider, store.clone(), Arc::new(StaticKnowledge), event_bus);
    Arc::new(GatewayState::new(
        Arc::new(agent),
        store,
        RateLimiter::per_minute(config.gateway.queries_per_minute),
    ))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = hydra_providers::build_from_config(&config)
        .default()
        .ok_or(GatewayError::NoProvider)?;
    let event_bus = Arc::new(EventBus::default());

    let state = match config.store.backend.as_str() {
        "memory" => {
            let store = Arc::new(InMemoryStore::new());
            // An empty in-memory catalog is useless; load the demo data
            seed_demo_data(store.as_ref(), false).await?;
            build_state(&config, provider, store, event_bus)
        }
        "sqlite" => {
            let path = config.store.database_path();
            let store = Arc::new(SqliteStore::open(&path).await?);
            if store.product_count().await? == 0 {
                warn!("Catalog is empty; run `hydra seed` to load demo products");
            }
            build_state(&config, provider, store, event_bus)
        }
        other => return Err(GatewayError::UnknownBackend(other.to_string())),
    };

    let app = build_router(state);

    info!(addr = %addr, backend = %config.store.backend, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Key a caller by user id, then forwarded client address.
fn rate_limit_key(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(user) = header(api_v1::USER_ID_HEADER) {
        return format!("user:{user}");
    }
    match header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        Some(ip) => format!("ip:{}", ip.trim()),
        None => "anonymous".to_string(),
    }
}

async fn rate_limit_middleware(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    let key = rate_limit_key(req.headers());
    match state.limiter.check(&key) {
        RateDecision::Allowed => next.run(req).await,
        RateDecision::Limited { retry_after_secs } => {
            warn!(client = %key.chars().take(40).collect::<String>(), "Rate limit exceeded");
            ApiError::TooManyRequests { retry_after_secs }.into_response()
        }
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
