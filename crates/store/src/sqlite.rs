//! SQLite backend for conversations, catalog, orders, and profiles.
//!
//! Tables:
//! - `conversations` / `messages`: chat history, ordered by autoincrement id
//! - `products`, `orders`, `order_items`: catalog and order records
//! - `user_profiles`: one hydration profile per user
//!
//! UUIDs, decimals, and timestamps are stored as TEXT.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hydra_core::catalog::*;
use hydra_core::error::StoreError;
use hydra_core::store::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::seed::CatalogWriter;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "conversations table",
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            user_id     TEXT,
            created_at  TEXT NOT NULL
        )
        "#,
    ),
    (
        "messages table",
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            sender           TEXT NOT NULL CHECK (sender IN ('user', 'ai')),
            text             TEXT NOT NULL,
            created_at       TEXT NOT NULL
        )
        "#,
    ),
    (
        "messages index",
        "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id)",
    ),
    (
        "conversations user index",
        "CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id, created_at DESC)",
    ),
    (
        "products table",
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            description   TEXT NOT NULL,
            price         TEXT NOT NULL,
            image_url     TEXT NOT NULL,
            seller        TEXT NOT NULL,
            category      TEXT NOT NULL,
            sub_category  TEXT NOT NULL,
            rating        TEXT NOT NULL,
            reviews       TEXT NOT NULL DEFAULT '',
            created_at    TEXT NOT NULL
        )
        "#,
    ),
    (
        "orders table",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id                TEXT PRIMARY KEY,
            shipping_address  TEXT NOT NULL,
            shipping_status   TEXT NOT NULL,
            delivery_date     TEXT NOT NULL,
            payment_status    TEXT NOT NULL,
            payment_method    TEXT NOT NULL,
            total_price       TEXT NOT NULL,
            tax               TEXT NOT NULL,
            shipping          TEXT NOT NULL,
            discount          TEXT NOT NULL,
            total             TEXT NOT NULL,
            created_at        TEXT NOT NULL
        )
        "#,
    ),
    (
        "order_items table",
        r#"
        CREATE TABLE IF NOT EXISTS order_items (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id    TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            product_id  TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            quantity    INTEGER NOT NULL DEFAULT 1,
            unit_price  TEXT NOT NULL,
            line_total  TEXT NOT NULL
        )
        "#,
    ),
    (
        "user_profiles table",
        r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            user_id             TEXT PRIMARY KEY,
            activity_level      TEXT NOT NULL,
            climate             TEXT NOT NULL,
            dietary_preference  TEXT,
            hydration_goal      TEXT,
            updated_at          TEXT NOT NULL
        )
        "#,
    ),
];

/// A SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // An in-memory database exists per connection
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Open a database file, creating its parent directory if needed.
    pub async fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(format!("Cannot create {}: {e}", parent.display())))?;
        }
        Self::new(&path.to_string_lossy()).await
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        for (name, sql) in MIGRATIONS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{name}: {e}")))?;
        }
        debug!("SQLite migrations complete");
        Ok(())
    }

    async fn items_for(&self, order_id: &Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT i.product_id, p.name AS product_name, i.quantity, i.unit_price, i.line_total
            FROM order_items i
            LEFT JOIN products p ON p.id = i.product_id
            WHERE i.order_id = ?1
            ORDER BY i.id
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("order items: {e}")))?;

        rows.iter().map(row_to_item).collect()
    }
}

// --- Row mapping ---

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn uuid_col(row: &SqliteRow, name: &str) -> Result<Uuid, StoreError> {
    let raw: String = col(row, name)?;
    Uuid::parse_str(&raw).map_err(|e| StoreError::QueryFailed(format!("{name} is not a UUID: {e}")))
}

fn decimal_col(row: &SqliteRow, name: &str) -> Result<Decimal, StoreError> {
    let raw: String = col(row, name)?;
    Decimal::from_str(&raw).map_err(|e| StoreError::QueryFailed(format!("{name} is not a decimal: {e}")))
}

fn time_col(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = col(row, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("{name} is not a timestamp: {e}")))
}

// Reviews are stored newline-separated
fn join_reviews(reviews: &[String]) -> String {
    reviews.join("\n")
}

fn split_reviews(raw: &str) -> Vec<String> {
    raw.lines().filter(|l| !l.is_empty()).map(String::from).collect()
}

fn row_to_product(row: &SqliteRow) -> Result<Product, StoreError> {
    let reviews: String = col(row, "reviews")?;
    Ok(Product {
        id: uuid_col(row, "id")?,
        name: col(row, "name")?,
        description: col(row, "description")?,
        price: decimal_col(row, "price")?,
        image_url: col(row, "image_url")?,
        seller: col(row, "seller")?,
        category: col(row, "category")?,
        sub_category: col(row, "sub_category")?,
        rating: decimal_col(row, "rating")?,
        reviews: split_reviews(&reviews),
        created_at: time_col(row, "created_at")?,
    })
}

fn row_to_order(row: &SqliteRow) -> Result<Order, StoreError> {
    Ok(Order {
        id: uuid_col(row, "id")?,
        shipping_address: col(row, "shipping_address")?,
        shipping_status: col(row, "shipping_status")?,
        delivery_date: time_col(row, "delivery_date")?,
        payment_status: col(row, "payment_status")?,
        payment_method: col(row, "payment_method")?,
        total_price: decimal_col(row, "total_price")?,
        tax: decimal_col(row, "tax")?,
        shipping: decimal_col(row, "shipping")?,
        discount: decimal_col(row, "discount")?,
        total: decimal_col(row, "total")?,
        created_at: time_col(row, "created_at")?,
    })
}

fn row_to_item(row: &SqliteRow) -> Result<OrderItem, StoreError> {
    let quantity: i64 = col(row, "quantity")?;
    Ok(OrderItem {
        product_id: uuid_col(row, "product_id")?,
        product_name: col(row, "product_name")?,
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::QueryFailed(format!("invalid quantity {quantity}")))?,
        unit_price: decimal_col(row, "unit_price")?,
        line_total: decimal_col(row, "line_total")?,
    })
}

fn row_to_profile(row: &SqliteRow) -> Result<UserProfile, StoreError> {
    let activity: String = col(row, "activity_level")?;
    let climate: String = col(row, "climate")?;
    Ok(UserProfile {
        user_id: col(row, "user_id")?,
        activity_level: ActivityLevel::parse(&activity)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown activity level '{activity}'")))?,
        climate: Climate::parse(&climate)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown climate '{climate}'")))?,
        dietary_preference: col(row, "dietary_preference")?,
        hydration_goal: col(row, "hydration_goal")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

fn row_to_turn(row: &SqliteRow) -> Result<StoredTurn, StoreError> {
    let sender: String = col(row, "sender")?;
    Ok(StoredTurn {
        sender: Sender::parse(&sender)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown sender '{sender}'")))?,
        text: col(row, "text")?,
        created_at: time_col(row, "created_at")?,
    })
}

/// Escape LIKE wildcards and wrap for a partial match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_conversation(&self, user_id: Option<&str>) -> Result<ConversationId, StoreError> {
        let id = ConversationId::generate();
        sqlx::query("INSERT INTO conversations (id, user_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(id.as_str())
            .bind(user_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT conversation failed: {e}")))?;
        debug!(conversation_id = %id, "Created conversation");
        Ok(id)
    }

    async fn conversation_exists(&self, id: &ConversationId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM conversations WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("conversation lookup: {e}")))?;
        Ok(row.is_some())
    }

    async fn load_recent_turns(&self, id: &ConversationId, limit: usize) -> Result<Vec<StoredTurn>, StoreError> {
        if !self.conversation_exists(id).await? {
            return Err(StoreError::ConversationNotFound(id.to_string()));
        }

        let rows = sqlx::query(
            r#"
            SELECT sender, text, created_at FROM (
                SELECT id, sender, text, created_at FROM messages
                WHERE conversation_id = ?1
                ORDER BY id DESC
                LIMIT ?2
            ) ORDER BY id ASC
            "#,
        )
        .bind(id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("recent turns: {e}")))?;

        rows.iter().map(row_to_turn).collect()
    }

    async fn append_turn(&self, id: &ConversationId, sender: Sender, text: &str) -> Result<(), StoreError> {
        if !self.conversation_exists(id).await? {
            return Err(StoreError::ConversationNotFound(id.to_string()));
        }

        sqlx::query("INSERT INTO messages (conversation_id, sender, text, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(id.as_str())
            .bind(sender.as_str())
            .bind(text)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT message failed: {e}")))?;
        Ok(())
    }

    async fn append_exchange(&self, id: &ConversationId, user_text: &str, ai_text: &str) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        let exists = sqlx::query("SELECT 1 FROM conversations WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("conversation lookup: {e}")))?;
        if exists.is_none() {
            return Err(StoreError::ConversationNotFound(id.to_string()));
        }

        let now = Utc::now().to_rfc3339();
        for (sender, text) in [(Sender::User, user_text), (Sender::Ai, ai_text)] {
            sqlx::query("INSERT INTO messages (conversation_id, sender, text, created_at) VALUES (?1, ?2, ?3, ?4)")
                .bind(id.as_str())
                .bind(sender.as_str())
                .bind(text)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Storage(format!("INSERT message failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;
        Ok(())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.user_id, c.created_at, COUNT(m.id) AS message_count
            FROM conversations c
            LEFT JOIN messages m ON m.conversation_id = c.id
            WHERE c.user_id = ?1
            GROUP BY c.id
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("list conversations: {e}")))?;

        rows.iter()
            .map(|row| {
                let id: String = col(row, "id")?;
                let count: i64 = col(row, "message_count")?;
                Ok(ConversationSummary {
                    id: ConversationId(id),
                    user_id: col(row, "user_id")?,
                    created_at: time_col(row, "created_at")?,
                    message_count: count as usize,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ProductCatalog for SqliteStore {
    async fn get_product(&self, id: &Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET product: {e}")))?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT * FROM products ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list products: {e}")))?;
        rows.iter().map(row_to_product).collect()
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut text_binds: Vec<String> = Vec::new();

        if let Some(q) = query.query_term() {
            conditions.push("(name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')");
            text_binds.push(like_pattern(q));
            text_binds.push(like_pattern(q));
        }
        if let Some(c) = query.category_term() {
            conditions.push("category LIKE ? ESCAPE '\\'");
            text_binds.push(like_pattern(c));
        }
        if let Some(s) = query.sub_category_term() {
            conditions.push("sub_category LIKE ? ESCAPE '\\'");
            text_binds.push(like_pattern(s));
        }

        let mut price_binds: Vec<f64> = Vec::new();
        if let Some(min) = query.min_price.and_then(|d| d.to_f64()) {
            conditions.push("CAST(price AS REAL) >= ?");
            price_binds.push(min);
        }
        if let Some(max) = query.max_price.and_then(|d| d.to_f64()) {
            conditions.push("CAST(price AS REAL) <= ?");
            price_binds.push(max);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("SELECT * FROM products {where_clause} ORDER BY name LIMIT ?");

        let mut db_query = sqlx::query(&sql);
        for value in &text_binds {
            db_query = db_query.bind(value);
        }
        for value in &price_binds {
            db_query = db_query.bind(*value);
        }
        db_query = db_query.bind(query.effective_limit() as i64);

        let rows = db_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("search products: {e}")))?;
        rows.iter().map(row_to_product).collect()
    }
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn find_order(&self, reference: &OrderRef) -> Result<Option<OrderWithItems>, StoreError> {
        let row = match reference {
            OrderRef::Full(id) => sqlx::query("SELECT * FROM orders WHERE id = ?1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await,
            OrderRef::Suffix(suffix) => {
                sqlx::query("SELECT * FROM orders WHERE lower(id) LIKE ?1 ORDER BY created_at DESC LIMIT 1")
                    .bind(format!("%{}", suffix.to_ascii_lowercase()))
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::QueryFailed(format!("find order: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = row_to_order(&row)?;
        let items = self.items_for(&order.id).await?;
        Ok(Some(OrderWithItems::new(order, items)))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list orders: {e}")))?;
        rows.iter().map(row_to_order).collect()
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET profile: {e}")))?;
        row.as_ref().map(row_to_profile).transpose()
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, activity_level, climate, dietary_preference, hydration_goal, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                activity_level = excluded.activity_level,
                climate = excluded.climate,
                dietary_preference = excluded.dietary_preference,
                hydration_goal = excluded.hydration_goal,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.user_id)
        .bind(profile.activity_level.as_str())
        .bind(profile.climate.as_str())
        .bind(&profile.dietary_preference)
        .bind(&profile.hydration_goal)
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT profile failed: {e}")))?;

        debug!(user_id = %profile.user_id, "Upserted profile");
        Ok(profile)
    }
}

#[async_trait]
impl CatalogWriter for SqliteStore {
    async fn product_count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT products: {e}")))?;
        let cnt: i64 = col(&row, "cnt")?;
        Ok(cnt as usize)
    }

    async fn insert_product(&self, p: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO products
                (id, name, description, price, image_url, seller, category, sub_category, rating, reviews, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(p.id.to_string())
        .bind(&p.name)
        .bind(&p.description)
        .bind(p.price.to_string())
        .bind(&p.image_url)
        .bind(&p.seller)
        .bind(&p.category)
        .bind(&p.sub_category)
        .bind(p.rating.to_string())
        .bind(join_reviews(&p.reviews))
        .bind(p.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT product failed: {e}")))?;
        Ok(())
    }

    async fn insert_order(&self, o: &Order, items: &[OrderItem]) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(o.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE order items failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO orders
                (id, shipping_address, shipping_status, delivery_date, payment_status, payment_method,
                 total_price, tax, shipping, discount, total, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(o.id.to_string())
        .bind(&o.shipping_address)
        .bind(&o.shipping_status)
        .bind(o.delivery_date.to_rfc3339())
        .bind(&o.payment_status)
        .bind(&o.payment_method)
        .bind(o.total_price.to_string())
        .bind(o.tax.to_string())
        .bind(o.shipping.to_string())
        .bind(o.discount.to_string())
        .bind(o.total.to_string())
        .bind(o.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT order failed: {e}")))?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price, line_total) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(o.id.to_string())
            .bind(item.product_id.to_string())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.to_string())
            .bind(item.line_total.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT order item failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;
        Ok(())
    }
}
