//! Records and backend traits the tools read and write.
//!
//! The dispatcher never talks to a database directly: every tool resolves to
//! one of these traits. Absent data is `Ok(None)` (or an empty list), never
//! an error; errors mean the backend itself failed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::StoreError;

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub seller: String,
    pub category: String,
    pub sub_category: String,
    pub rating: Decimal,
    #[serde(default)]
    pub reviews: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// An order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub shipping_address: String,
    pub shipping_status: String,
    pub delivery_date: DateTime<Utc>,
    pub payment_status: String,
    pub payment_method: String,
    pub total_price: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// The short form users see, e.g. `#ORD-22C56AE4`.
    pub fn short_ref(&self) -> String {
        let id = self.id.simple().to_string();
        format!("#ORD-{}", id[id.len() - 8..].to_uppercase())
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// An order with its line items, as returned by `getOrderById`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub short_ref: String,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        let short_ref = order.short_ref();
        Self { order, short_ref, items }
    }
}

/// A reference to an order as a user would type it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    /// A canonical UUID.
    Full(Uuid),
    /// The last eight hex digits of the UUID, uppercase.
    Suffix(String),
}

impl OrderRef {
    /// Parse `#ORD-22C56AE4`, `ORD-22C56AE4`, `22C56AE4`, or a full UUID.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if let Ok(id) = Uuid::parse_str(trimmed) {
            return Some(Self::Full(id));
        }

        let stripped = trimmed.trim_start_matches('#');
        let body = match stripped.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("ORD-") => &stripped[4..],
            _ => stripped,
        };

        if body.len() == 8 && body.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self::Suffix(body.to_ascii_uppercase()))
        } else {
            None
        }
    }

    /// Whether an order id is the one this reference points at.
    pub fn matches(&self, id: &Uuid) -> bool {
        match self {
            Self::Full(full) => full == id,
            Self::Suffix(suffix) => id.simple().to_string().to_ascii_uppercase().ends_with(suffix.as_str()),
        }
    }
}

impl std::fmt::Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full(id) => write!(f, "{id}"),
            Self::Suffix(s) => write!(f, "#ORD-{s}"),
        }
    }
}

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Filters for `searchProducts`. Text filters are case-insensitive partial
/// matches; blank strings are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<usize>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ProductQuery {
    /// The limit clamped to `1..=50`, defaulting to 10.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT)
    }

    pub fn query_term(&self) -> Option<&str> {
        non_blank(&self.query)
    }

    pub fn category_term(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    pub fn sub_category_term(&self) -> Option<&str> {
        non_blank(&self.sub_category)
    }

    /// Whether a product passes every filter.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(q) = self.query_term() {
            if !contains_ci(&product.name, q) && !contains_ci(&product.description, q) {
                return false;
            }
        }
        if let Some(c) = self.category_term() {
            if !contains_ci(&product.category, c) {
                return false;
            }
        }
        if let Some(s) = self.sub_category_term() {
            if !contains_ci(&product.sub_category, s) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        true
    }
}

/// Price bounds across the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// What `getProductCatalog` returns: the values the model should use as
/// exact search filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub categories: Vec<String>,
    pub sub_categories: Vec<String>,
    pub price_range: PriceRange,
    pub total_products: usize,
}

impl CatalogSummary {
    /// Summarize a product list. An empty catalog has a zero price range.
    pub fn from_products(products: &[Product]) -> Self {
        let categories: BTreeSet<_> = products.iter().map(|p| p.category.clone()).collect();
        let sub_categories: BTreeSet<_> = products.iter().map(|p| p.sub_category.clone()).collect();
        let min = products.iter().map(|p| p.price).min().unwrap_or_default();
        let max = products.iter().map(|p| p.price).max().unwrap_or_default();
        Self {
            categories: categories.into_iter().collect(),
            sub_categories: sub_categories.into_iter().collect(),
            price_range: PriceRange { min, max },
            total_products: products.len(),
        }
    }
}

/// How active a user is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Moderate,
    Active,
}

/// The climate a user lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Climate {
    Dry,
    Humid,
    Temperate,
}

macro_rules! str_enum {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $s),+ }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($s => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

str_enum!(ActivityLevel { Sedentary => "sedentary", Moderate => "moderate", Active => "active" });
str_enum!(Climate { Dry => "dry", Humid => "humid", Temperate => "temperate" });

/// A user's hydration profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub activity_level: ActivityLevel,
    pub climate: Climate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydration_goal: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Static knowledge topics served by the knowledge tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnowledgeTopic {
    AppPurpose,
    BotDocumentation,
    CompanyInformation,
    ShippingPolicy,
    ReturnsAndRefundsPolicy,
}

// --- Backend traits ---

/// Read access to the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: &Uuid) -> std::result::Result<Option<Product>, StoreError>;

    async fn list_products(&self) -> std::result::Result<Vec<Product>, StoreError>;

    /// Products matching `query`, at most `query.effective_limit()` of them.
    async fn search_products(&self, query: &ProductQuery) -> std::result::Result<Vec<Product>, StoreError>;

    async fn catalog_summary(&self) -> std::result::Result<CatalogSummary, StoreError> {
        let products = self.list_products().await?;
        Ok(CatalogSummary::from_products(&products))
    }
}

/// Read access to orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Resolve a reference. A suffix matching several orders yields the
    /// most recent one.
    async fn find_order(&self, reference: &OrderRef) -> std::result::Result<Option<OrderWithItems>, StoreError>;

    async fn list_orders(&self) -> std::result::Result<Vec<Order>, StoreError>;
}

/// Per-user hydration profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, StoreError>;

    /// Insert or replace the profile for `profile.user_id`.
    async fn upsert_profile(&self, profile: UserProfile) -> std::result::Result<UserProfile, StoreError>;
}

/// Static support texts.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn fetch(&self, topic: KnowledgeTopic) -> std::result::Result<String, StoreError>;
}
