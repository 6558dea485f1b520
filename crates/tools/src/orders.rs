//! `getOrderById` and `listAllOrders`.

use hydra_core::catalog::OrderRef;
use hydra_core::error::ToolError;
use serde::Deserialize;
use serde_json::Value;

use crate::{ToolBackends, ToolName, backend_failure, parse_args, to_json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetOrderArgs {
    order_id: String,
}

pub(crate) async fn get_order_by_id(backends: &ToolBackends, args: Value) -> Result<Value, ToolError> {
    let tool = ToolName::GetOrderById;
    let args: GetOrderArgs = parse_args(args)?;
    let reference = OrderRef::parse(&args.order_id).ok_or_else(|| {
        ToolError::InvalidArguments(format!(
            "'{}' is not an order id. Use the full order ID or the short format like #ORD-22C56AE4",
            args.order_id
        ))
    })?;

    let order = backends
        .orders
        .find_order(&reference)
        .await
        .map_err(|e| backend_failure(tool, e))?
        .ok_or_else(|| ToolError::NotFound {
            resource: "Order".into(),
            reference: reference.to_string(),
        })?;

    to_json(tool, &order)
}

pub(crate) async fn list_all_orders(backends: &ToolBackends) -> Result<Value, ToolError> {
    let tool = ToolName::ListAllOrders;
    let orders = backends.orders.list_orders().await.map_err(|e| backend_failure(tool, e))?;
    to_json(tool, &orders)
}
