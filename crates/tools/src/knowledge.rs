//! The static knowledge tools.

use hydra_core::catalog::KnowledgeTopic;
use hydra_core::error::ToolError;
use serde_json::{Value, json};

use crate::{ToolBackends, ToolName, backend_failure};

pub(crate) fn topic_for(tool: ToolName) -> Option<KnowledgeTopic> {
    match tool {
        ToolName::GetAppPurpose => Some(KnowledgeTopic::AppPurpose),
        ToolName::GetBotDocumentation => Some(KnowledgeTopic::BotDocumentation),
        ToolName::GetCompanyInformation => Some(KnowledgeTopic::CompanyInformation),
        ToolName::GetShippingPolicy => Some(KnowledgeTopic::ShippingPolicy),
        ToolName::GetReturnsAndRefundsPolicy => Some(KnowledgeTopic::ReturnsAndRefundsPolicy),
        _ => None,
    }
}

pub(crate) async fn fetch(backends: &ToolBackends, tool: ToolName, topic: KnowledgeTopic) -> Result<Value, ToolError> {
    let text = backends
        .knowledge
        .fetch(topic)
        .await
        .map_err(|e| backend_failure(tool, e))?;
    Ok(json!({ "content": text }))
}
