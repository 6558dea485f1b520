//! Routes model tool calls to their implementations.
//!
//! The dispatcher never fails: unknown tools, malformed arguments, missing
//! identity, backend errors and timeouts all come back as a [`ToolResult`]
//! with a structured error payload the model can read.

use std::time::{Duration, Instant};

use hydra_core::error::ToolError;
use hydra_core::tool::{CallerContext, ToolInvocation, ToolResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::registry::{IdentityPolicy, ToolName};
use crate::{ToolBackends, knowledge, orders, products, profile};

/// Default per-tool time limit.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes tool invocations against the injected backends.
#[derive(Clone)]
pub struct ToolDispatcher {
    backends: ToolBackends,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(backends: ToolBackends) -> Self {
        Self {
            backends,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one invocation for `caller`.
    pub async fn dispatch(&self, invocation: &ToolInvocation, caller: &CallerContext) -> ToolResult {
        let started = Instant::now();
        let outcome = self.execute(invocation, caller).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(data) => {
                debug!(tool = %invocation.name, call_id = %invocation.id, elapsed_ms, "Tool succeeded");
                ToolResult::ok(&invocation.id, &data)
            }
            Err(e) => {
                warn!(
                    tool = %invocation.name,
                    call_id = %invocation.id,
                    kind = e.kind(),
                    elapsed_ms,
                    "Tool failed: {e}"
                );
                ToolResult::error(&invocation.id, &e.to_payload())
            }
        }
    }

    async fn execute(&self, invocation: &ToolInvocation, caller: &CallerContext) -> Result<Value, ToolError> {
        let tool: ToolName = invocation
            .name
            .parse()
            .map_err(|_| ToolError::UnknownTool(invocation.name.clone()))?;

        let args = parse_raw_arguments(&invocation.raw_arguments)?;

        let user_id = match tool.identity() {
            IdentityPolicy::None => None,
            IdentityPolicy::Required => Some(caller.user_id().ok_or_else(|| {
                ToolError::MissingIdentity(format!("{tool} requires a logged-in user"))
            })?),
        };

        match tokio::time::timeout(self.timeout, self.run(tool, args, user_id)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool_name: tool.as_str().to_string(),
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn run(&self, tool: ToolName, args: Value, user_id: Option<&str>) -> Result<Value, ToolError> {
        let b = &self.backends;
        match tool {
            ToolName::GetOrderById => orders::get_order_by_id(b, args).await,
            ToolName::ListAllOrders => orders::list_all_orders(b).await,
            ToolName::GetProductById => products::get_product_by_id(b, args).await,
            ToolName::ListAllProducts => products::list_all_products(b).await,
            ToolName::GetProductCatalog => products::get_product_catalog(b).await,
            ToolName::SearchProducts => products::search_products(b, args).await,
            ToolName::GetAppPurpose
            | ToolName::GetBotDocumentation
            | ToolName::GetCompanyInformation
            | ToolName::GetShippingPolicy
            | ToolName::GetReturnsAndRefundsPolicy => match knowledge::topic_for(tool) {
                Some(topic) => knowledge::fetch(b, tool, topic).await,
                None => Err(ToolError::UnknownTool(tool.to_string())),
            },
            ToolName::GetUserProfile => profile::get_user_profile(b, require(tool, user_id)?).await,
            ToolName::UpdateUserProfile => profile::update_user_profile(b, require(tool, user_id)?, args).await,
        }
    }
}

fn require(tool: ToolName, user_id: Option<&str>) -> Result<&str, ToolError> {
    user_id.ok_or_else(|| ToolError::MissingIdentity(format!("{tool} requires a logged-in user")))
}

/// Parse the model's raw argument string. Blank means no arguments.
fn parse_raw_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Value::Object(map)),
        Ok(Value::Null) => Ok(Value::Object(Default::default())),
        Ok(other) => Err(ToolError::InvalidArguments(format!(
            "arguments must be a JSON object, got {other}"
        ))),
        Err(e) => Err(ToolError::InvalidArguments(format!("malformed JSON: {e}"))),
    }
}
