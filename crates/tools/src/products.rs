//! Product lookups: by id, full list, catalog summary, and search.

use hydra_core::catalog::ProductQuery;
use hydra_core::error::ToolError;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{ToolBackends, ToolName, backend_failure, parse_args, to_json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetProductArgs {
    product_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    query: Option<String>,
    category: Option<String>,
    sub_category: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    limit: Option<i64>,
}

impl SearchArgs {
    fn into_query(self) -> Result<ProductQuery, ToolError> {
        let negative = |p: &Option<Decimal>| p.is_some_and(|v| v.is_sign_negative());
        if negative(&self.min_price) || negative(&self.max_price) {
            return Err(ToolError::InvalidArguments("prices must not be negative".into()));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ToolError::InvalidArguments(format!(
                    "minPrice ({min}) is greater than maxPrice ({max})"
                )));
            }
        }
        Ok(ProductQuery {
            query: self.query,
            category: self.category,
            sub_category: self.sub_category,
            min_price: self.min_price,
            max_price: self.max_price,
            // Out-of-range limits are clamped by the query
            limit: self.limit.map(|l| l.max(0) as usize),
        })
    }
}

pub(crate) async fn get_product_by_id(backends: &ToolBackends, args: Value) -> Result<Value, ToolError> {
    let tool = ToolName::GetProductById;
    let args: GetProductArgs = parse_args(args)?;
    let id = Uuid::parse_str(args.product_id.trim())
        .map_err(|_| ToolError::InvalidArguments(format!("'{}' is not a product UUID", args.product_id)))?;

    let product = backends
        .products
        .get_product(&id)
        .await
        .map_err(|e| backend_failure(tool, e))?
        .ok_or_else(|| ToolError::NotFound {
            resource: "Product".into(),
            reference: id.to_string(),
        })?;

    to_json(tool, &product)
}

pub(crate) async fn list_all_products(backends: &ToolBackends) -> Result<Value, ToolError> {
    let tool = ToolName::ListAllProducts;
    let products = backends.products.list_products().await.map_err(|e| backend_failure(tool, e))?;
    to_json(tool, &products)
}

pub(crate) async fn get_product_catalog(backends: &ToolBackends) -> Result<Value, ToolError> {
    let tool = ToolName::GetProductCatalog;
    let summary = backends.products.catalog_summary().await.map_err(|e| backend_failure(tool, e))?;
    to_json(tool, &summary)
}

pub(crate) async fn search_products(backends: &ToolBackends, args: Value) -> Result<Value, ToolError> {
    let tool = ToolName::SearchProducts;
    let args: SearchArgs = parse_args(args)?;
    let query = args.into_query()?;
    let products = backends
        .products
        .search_products(&query)
        .await
        .map_err(|e| backend_failure(tool, e))?;
    to_json(tool, &products)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_args_accept_numbers_for_prices() {
        let args: SearchArgs =
            serde_json::from_value(serde_json::json!({"minPrice": 80, "maxPrice": 99.5, "limit": 500})).unwrap();
        let query = args.into_query().unwrap();
        assert_eq!(query.min_price, Some(Decimal::new(80, 0)));
        assert_eq!(query.effective_limit(), 50);
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let args = SearchArgs {
            min_price: Some(Decimal::new(100, 0)),
            max_price: Some(Decimal::new(50, 0)),
            ..Default::default()
        };
        assert!(matches!(args.into_query(), Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn negative_limit_clamps_to_one() {
        let args = SearchArgs { limit: Some(-3), ..Default::default() };
        assert_eq!(args.into_query().unwrap().effective_limit(), 1);
    }
}
