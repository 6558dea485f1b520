//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hydra_core::catalog::*;
use hydra_core::error::StoreError;
use hydra_core::store::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::seed::CatalogWriter;

struct ConversationRecord {
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    turns: Vec<StoredTurn>,
}

/// A store that keeps everything in process memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    conversations: Arc<RwLock<HashMap<ConversationId, ConversationRecord>>>,
    products: Arc<RwLock<Vec<Product>>>,
    orders: Arc<RwLock<Vec<OrderWithItems>>>,
    profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create_conversation(&self, user_id: Option<&str>) -> Result<ConversationId, StoreError> {
        let id = ConversationId::generate();
        self.conversations.write().await.insert(
            id.clone(),
            ConversationRecord {
                user_id: user_id.map(String::from),
                created_at: Utc::now(),
                turns: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn conversation_exists(&self, id: &ConversationId) -> Result<bool, StoreError> {
        Ok(self.conversations.read().await.contains_key(id))
    }

    async fn load_recent_turns(&self, id: &ConversationId, limit: usize) -> Result<Vec<StoredTurn>, StoreError> {
        let conversations = self.conversations.read().await;
        let record = conversations
            .get(id)
            .ok_or_else(|| StoreError::ConversationNotFound(id.to_string()))?;
        let skip = record.turns.len().saturating_sub(limit);
        Ok(record.turns[skip..].to_vec())
    }

    async fn append_turn(&self, id: &ConversationId, sender: Sender, text: &str) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        let record = conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::ConversationNotFound(id.to_string()))?;
        record.turns.push(StoredTurn {
            sender,
            text: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn append_exchange(&self, id: &ConversationId, user_text: &str, ai_text: &str) -> Result<(), StoreError> {
        // One write lock for both turns
        let mut conversations = self.conversations.write().await;
        let record = conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::ConversationNotFound(id.to_string()))?;
        let now = Utc::now();
        record.turns.push(StoredTurn { sender: Sender::User, text: user_text.to_string(), created_at: now });
        record.turns.push(StoredTurn { sender: Sender::Ai, text: ai_text.to_string(), created_at: now });
        Ok(())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let conversations = self.conversations.read().await;
        let mut summaries: Vec<ConversationSummary> = conversations
            .iter()
            .filter(|(_, r)| r.user_id.as_deref() == Some(user_id))
            .map(|(id, r)| ConversationSummary {
                id: id.clone(),
                user_id: r.user_id.clone(),
                created_at: r.created_at,
                message_count: r.turns.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn get_product(&self, id: &Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.iter().find(|p| &p.id == id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut products = self.products.read().await.clone();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let mut matches: Vec<Product> = self
            .products
            .read()
            .await
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches.truncate(query.effective_limit());
        Ok(matches)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn find_order(&self, reference: &OrderRef) -> Result<Option<OrderWithItems>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|o| reference.matches(&o.order.id))
            .max_by_key(|o| o.order.created_at)
            .cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self.orders.read().await.iter().map(|o| o.order.clone()).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl CatalogWriter for InMemoryStore {
    async fn product_count(&self) -> Result<usize, StoreError> {
        Ok(self.products.read().await.len())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut products = self.products.write().await;
        products.retain(|p| p.id != product.id);
        products.push(product.clone());
        Ok(())
    }

    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<(), StoreError> {
        let products = self.products.read().await;
        let items = items
            .iter()
            .cloned()
            .map(|mut item| {
                item.product_name = products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .map(|p| p.name.clone());
                item
            })
            .collect();
        let mut orders = self.orders.write().await;
        orders.retain(|o| o.order.id != order.id);
        orders.push(OrderWithItems::new(order.clone(), items));
        Ok(())
    }
}
