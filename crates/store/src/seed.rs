//! Demo catalog and sample orders for `hydra seed` and tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hydra_core::catalog::{Order, OrderItem, Product};
use hydra_core::error::StoreError;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// Write access used only for seeding.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn product_count(&self) -> Result<usize, StoreError>;

    /// Insert or replace a product.
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Insert or replace an order and its items.
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<(), StoreError>;
}

/// What a seed run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub products: usize,
    pub orders: usize,
    pub skipped: bool,
}

pub const TITAN_ID: Uuid = Uuid::from_u128(0x3f9a61c2_8d14_4c0e_9b27_51e0a4d7c101);
pub const COPPER_ID: Uuid = Uuid::from_u128(0x3f9a61c2_8d14_4c0e_9b27_51e0a4d7c102);
pub const MIDNIGHT_ID: Uuid = Uuid::from_u128(0x3f9a61c2_8d14_4c0e_9b27_51e0a4d7c103);
pub const ALABASTER_ID: Uuid = Uuid::from_u128(0x3f9a61c2_8d14_4c0e_9b27_51e0a4d7c104);
pub const CHROME_ID: Uuid = Uuid::from_u128(0x3f9a61c2_8d14_4c0e_9b27_51e0a4d7c105);
pub const RAW_ID: Uuid = Uuid::from_u128(0x3f9a61c2_8d14_4c0e_9b27_51e0a4d7c106);

/// Short reference `#ORD-22C56AE4`.
pub const SHIPPED_ORDER_ID: Uuid = Uuid::from_u128(0x0b7c1e2a_3d4f_4a5b_8c6d_9e0f22c56ae4);
/// Short reference `#ORD-7B2C91D0`.
pub const PROCESSING_ORDER_ID: Uuid = Uuid::from_u128(0x5e8d2f10_6a3b_4f7c_a1d9_4c2e7b2c91d0);
/// Short reference `#ORD-A4E03F57`.
pub const DELIVERED_ORDER_ID: Uuid = Uuid::from_u128(0x91c4b7e3_0f2a_4d68_b5e1_8d37a4e03f57);

fn seeded_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap_or_default()
}

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

struct ProductSpec {
    id: Uuid,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    image: &'static str,
    category: &'static str,
    sub_category: &'static str,
    reviews: [&'static str; 2],
}

const PRODUCTS: [ProductSpec; 6] = [
    ProductSpec {
        id: TITAN_ID,
        name: "TITAN X-1",
        description: "Aerospace-grade titanium hydration vessel. Lightweight, durable, with superior thermal performance.",
        price_cents: 12000,
        image: "/images/products/B-1.png",
        category: "Titanium",
        sub_category: "Aerospace Grade / 750ml",
        reviews: ["Incredible bottle", "Worth every penny"],
    },
    ProductSpec {
        id: COPPER_ID,
        name: "COPPER CORE",
        description: "Antimicrobial copper interior with a sleek exterior and natural purification properties.",
        price_cents: 9500,
        image: "/images/products/B-2.png",
        category: "Copper",
        sub_category: "Antimicrobial / 500ml",
        reviews: ["Love the copper finish", "Keeps water cold for hours"],
    },
    ProductSpec {
        id: MIDNIGHT_ID,
        name: "MIDNIGHT OPS",
        description: "Stealth matte black finish. Maximum capacity with an understated profile.",
        price_cents: 8500,
        image: "/images/products/B-3.png",
        category: "Midnight",
        sub_category: "Stealth Matte / 1000ml",
        reviews: ["Best bottle I own", "Sleek and durable"],
    },
    ProductSpec {
        id: ALABASTER_ID,
        name: "ALABASTER",
        description: "Soft-touch ceramic exterior. A refined piece for desk or travel.",
        price_cents: 7500,
        image: "/images/products/B-4.png",
        category: "Ceramic",
        sub_category: "Soft Touch / 750ml",
        reviews: ["Gorgeous design", "Very satisfied"],
    },
    ProductSpec {
        id: CHROME_ID,
        name: "CHROME SERIES",
        description: "Triple-wall vacuum insulation in brushed steel. Cold for 24 hours, hot for 12.",
        price_cents: 11000,
        image: "/images/products/B-5.png",
        category: "Insulated",
        sub_category: "Triple Wall / 750ml",
        reviews: ["Insulation is amazing", "Stays cold all day"],
    },
    ProductSpec {
        id: RAW_ID,
        name: "RAW INDUSTRIAL",
        description: "Unfinished steel with raw industrial character.",
        price_cents: 14500,
        image: "/images/products/B-6.png",
        category: "Limited",
        sub_category: "Unfinished Steel / 1000ml",
        reviews: ["One of a kind", "Perfect for my desk"],
    },
];

/// The demo bottle catalog.
pub fn demo_products() -> Vec<Product> {
    let created_at = seeded_at();
    PRODUCTS
        .iter()
        .map(|p| Product {
            id: p.id,
            name: p.name.into(),
            description: p.description.into(),
            price: money(p.price_cents),
            image_url: p.image.into(),
            seller: "Artistic Grid Co.".into(),
            category: p.category.into(),
            sub_category: p.sub_category.into(),
            rating: Decimal::new(5, 0),
            reviews: p.reviews.iter().map(|r| r.to_string()).collect(),
            created_at,
        })
        .collect()
}

fn line(product_id: Uuid, quantity: u32, unit_cents: i64) -> OrderItem {
    OrderItem {
        product_id,
        product_name: None,
        quantity,
        unit_price: money(unit_cents),
        line_total: money(unit_cents * i64::from(quantity)),
    }
}

fn order(id: Uuid, shipping_status: &str, payment_method: &str, age_days: i64, items: &[OrderItem]) -> Order {
    let created_at = seeded_at() + Duration::days(10 - age_days);
    let total_price: Decimal = items.iter().map(|i| i.line_total).sum();
    let tax = (total_price * Decimal::new(18, 2)).round_dp(2);
    let shipping = if total_price >= money(150_000) { Decimal::ZERO } else { money(9900) };
    let total = total_price + tax + shipping;
    Order {
        id,
        shipping_address: "14 Lake View Road, Bengaluru 560001".into(),
        shipping_status: shipping_status.into(),
        delivery_date: created_at + Duration::days(4),
        payment_status: "paid".into(),
        payment_method: payment_method.into(),
        total_price,
        tax,
        shipping,
        discount: Decimal::ZERO,
        total,
        created_at,
    }
}

/// Sample orders with their items.
pub fn demo_orders() -> Vec<(Order, Vec<OrderItem>)> {
    let shipped = vec![line(TITAN_ID, 1, 12000), line(COPPER_ID, 2, 9500)];
    let processing = vec![line(ALABASTER_ID, 1, 7500)];
    let delivered = vec![line(MIDNIGHT_ID, 1, 8500), line(CHROME_ID, 1, 11000)];
    vec![
        (order(SHIPPED_ORDER_ID, "shipped", "upi", 2, &shipped), shipped),
        (order(PROCESSING_ORDER_ID, "processing", "card", 0, &processing), processing),
        (order(DELIVERED_ORDER_ID, "delivered", "cod", 9, &delivered), delivered),
    ]
}

/// Load the demo catalog and orders. Skips when products already exist
/// unless `force` is set.
pub async fn seed_demo_data(writer: &dyn CatalogWriter, force: bool) -> Result<SeedReport, StoreError> {
    let existing = writer.product_count().await?;
    if existing > 0 && !force {
        info!(existing, "Products already present, skipping seed");
        return Ok(SeedReport { products: 0, orders: 0, skipped: true });
    }

    let products = demo_products();
    for product in &products {
        writer.insert_product(product).await?;
    }

    let orders = demo_orders();
    for (order, items) in &orders {
        writer.insert_order(order, items).await?;
    }

    info!(products = products.len(), orders = orders.len(), "Seeded demo data");
    Ok(SeedReport {
        products: products.len(),
        orders: orders.len(),
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use hydra_core::catalog::OrderRef;

    #[test]
    fn order_totals_add_up() {
        for (order, items) in demo_orders() {
            let sum: Decimal = items.iter().map(|i| i.line_total).sum();
            assert_eq!(order.total_price, sum);
            assert_eq!(order.total, order.total_price + order.tax + order.shipping - order.discount);
        }
    }

    #[test]
    fn short_refs_are_documented() {
        let orders = demo_orders();
        assert_eq!(orders[0].0.short_ref(), "#ORD-22C56AE4");
        assert!(OrderRef::parse("22c56ae4").unwrap().matches(&SHIPPED_ORDER_ID));
    }

    #[tokio::test]
    async fn seeding_twice_is_skipped() {
        let store = InMemoryStore::new();
        let first = seed_demo_data(&store, false).await.unwrap();
        assert_eq!(first.products, 6);
        assert!(!first.skipped);

        let second = seed_demo_data(&store, false).await.unwrap();
        assert!(second.skipped);

        let forced = seed_demo_data(&store, true).await.unwrap();
        assert!(!forced.skipped);
        assert_eq!(store.product_count().await.unwrap(), 6);
    }
}
