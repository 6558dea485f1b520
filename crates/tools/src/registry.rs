//! The closed set of tools the model may call.
//!
//! Wire names are the model contract and stay strings on the wire; inside
//! the crate every tool is a [`ToolName`] variant so dispatch is exhaustive.

use hydra_core::provider::ToolDefinition;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// Every tool the engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetOrderById,
    GetProductById,
    ListAllOrders,
    ListAllProducts,
    GetProductCatalog,
    SearchProducts,
    GetAppPurpose,
    GetBotDocumentation,
    GetCompanyInformation,
    GetShippingPolicy,
    GetReturnsAndRefundsPolicy,
    GetUserProfile,
    UpdateUserProfile,
}

/// Where a tool gets the user it acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// The tool does not act for a user.
    None,
    /// The tool acts only for the caller; without one it refuses.
    Required,
}

impl ToolName {
    /// All tools, in catalog order.
    pub const ALL: [ToolName; 13] = [
        Self::GetOrderById,
        Self::GetProductById,
        Self::ListAllOrders,
        Self::ListAllProducts,
        Self::GetProductCatalog,
        Self::SearchProducts,
        Self::GetAppPurpose,
        Self::GetBotDocumentation,
        Self::GetCompanyInformation,
        Self::GetShippingPolicy,
        Self::GetReturnsAndRefundsPolicy,
        Self::GetUserProfile,
        Self::UpdateUserProfile,
    ];

    /// The wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetOrderById => "getOrderById",
            Self::GetProductById => "getProductById",
            Self::ListAllOrders => "listAllOrders",
            Self::ListAllProducts => "listAllProducts",
            Self::GetProductCatalog => "getProductCatalog",
            Self::SearchProducts => "searchProducts",
            Self::GetAppPurpose => "getAppPurpose",
            Self::GetBotDocumentation => "getBotDocumentation",
            Self::GetCompanyInformation => "getCompanyInformation",
            Self::GetShippingPolicy => "getShippingPolicy",
            Self::GetReturnsAndRefundsPolicy => "getReturnsAndRefundsPolicy",
            Self::GetUserProfile => "getUserProfile",
            Self::UpdateUserProfile => "updateUserProfile",
        }
    }

    pub fn identity(&self) -> IdentityPolicy {
        match self {
            Self::GetUserProfile | Self::UpdateUserProfile => IdentityPolicy::Required,
            _ => IdentityPolicy::None,
        }
    }

    /// Whether the tool writes state.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::UpdateUserProfile)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::GetOrderById => {
                "Fetch one order with its line items. Accepts the full order UUID or the short form users see, such as #ORD-22C56AE4, ORD-22C56AE4 or 22C56AE4."
            }
            Self::GetProductById => "Fetch one product by its UUID.",
            Self::ListAllOrders => "List all orders, newest first. Use for disambiguation when the order id is unknown.",
            Self::ListAllProducts => "List all products. Use for disambiguation when the product id is unknown.",
            Self::GetProductCatalog => {
                "Summarize the catalog: exact category and sub-category values, price range, and product count. Call before searchProducts."
            }
            Self::SearchProducts => {
                "Search products by text, category, sub-category, and price range. Text filters are case-insensitive partial matches."
            }
            Self::GetAppPurpose => "Explain what this app and Arctic do and why the store exists.",
            Self::GetBotDocumentation => "Documentation about how this assistant works: architecture, tools, limits, and API.",
            Self::GetCompanyInformation => "Company information, support contacts, and terms summary.",
            Self::GetShippingPolicy => "The shipping policy: timelines, rates, COD, tracking, and damaged items.",
            Self::GetReturnsAndRefundsPolicy => "The returns and refunds policy.",
            Self::GetUserProfile => {
                "Get the logged-in user's hydration profile (activity level, climate, goals). Only call when the user is logged in."
            }
            Self::UpdateUserProfile => {
                "Update the logged-in user's hydration profile. Provide only the fields that changed. Only call when the user is logged in."
            }
        }
    }

    /// JSON Schema of the tool's arguments.
    pub fn parameters_schema(&self) -> serde_json::Value {
        match self {
            Self::GetOrderById => json!({
                "type": "object",
                "properties": {
                    "orderId": {
                        "type": "string",
                        "description": "Full order UUID, or short form like #ORD-22C56AE4 / 22C56AE4"
                    }
                },
                "required": ["orderId"]
            }),
            Self::GetProductById => json!({
                "type": "object",
                "properties": {
                    "productId": { "type": "string", "description": "Product UUID" }
                },
                "required": ["productId"]
            }),
            Self::SearchProducts => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to match in name or description" },
                    "category": { "type": "string", "description": "Category, as listed by getProductCatalog" },
                    "subCategory": { "type": "string", "description": "Sub-category, as listed by getProductCatalog" },
                    "minPrice": { "type": "number", "description": "Minimum price" },
                    "maxPrice": { "type": "number", "description": "Maximum price" },
                    "limit": { "type": "integer", "description": "Maximum results (1-50, default 10)" }
                }
            }),
            Self::UpdateUserProfile => json!({
                "type": "object",
                "properties": {
                    "activityLevel": { "type": "string", "enum": ["sedentary", "moderate", "active"] },
                    "climate": { "type": "string", "enum": ["dry", "humid", "temperate"] },
                    "dietaryPreference": { "type": "string" },
                    "hydrationGoal": { "type": "string" }
                }
            }),
            _ => json!({ "type": "object", "properties": {} }),
        }
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s).ok_or(())
    }
}

/// Tool definitions sent to the model with every completion request.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::to_definition).collect()
}
