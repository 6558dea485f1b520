//! Tool registry and dispatcher for Hydra.
//!
//! Tools let the model ground its answers in data: look up orders and
//! products, read the support policies, and read or update the caller's
//! hydration profile. Every tool resolves to a backend trait from
//! `hydra_core::catalog`, injected through [`ToolBackends`].

pub mod dispatcher;
pub mod knowledge;
pub mod orders;
pub mod products;
pub mod profile;
pub mod registry;

use hydra_core::catalog::{KnowledgeBase, OrderStore, ProductCatalog, ProfileStore};
use hydra_core::error::{StoreError, ToolError};
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub use dispatcher::ToolDispatcher;
pub use registry::{IdentityPolicy, ToolName, tool_definitions};

/// The backends the tools read and write through.
#[derive(Clone)]
pub struct ToolBackends {
    pub products: Arc<dyn ProductCatalog>,
    pub orders: Arc<dyn OrderStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub knowledge: Arc<dyn KnowledgeBase>,
}

impl ToolBackends {
    /// Use one store for products, orders, and profiles.
    pub fn from_store<S>(store: Arc<S>, knowledge: Arc<dyn KnowledgeBase>) -> Self
    where
        S: ProductCatalog + OrderStore + ProfileStore + 'static,
    {
        Self {
            products: store.clone(),
            orders: store.clone(),
            profiles: store,
            knowledge,
        }
    }
}

/// Deserialize a tool's typed arguments.
pub(crate) fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

pub(crate) fn backend_failure(tool: ToolName, err: StoreError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.as_str().to_string(),
        reason: err.to_string(),
    }
}

pub(crate) fn to_json<T: serde::Serialize>(tool: ToolName, value: &T) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool.as_str().to_string(),
        reason: format!("result serialization: {e}"),
    })
}
