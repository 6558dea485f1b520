//! # Hydra Core
//!
//! Domain types, traits, and error definitions for the Hydra support agent.
//! This crate has **no framework dependencies**: it defines the model that
//! the provider, store, tool, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration engine is a trait here
//! (completion provider, conversation store, catalog backends). Concrete
//! implementations live in their own crates and are injected at construction,
//! which keeps runs independent and makes every seam replaceable in tests.

pub mod catalog;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod response;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use catalog::{
    ActivityLevel, CatalogSummary, Climate, KnowledgeBase, KnowledgeTopic, Order, OrderItem, OrderRef,
    OrderStore, OrderWithItems, Product, ProductCatalog, ProductQuery, ProfileStore, UserProfile,
};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use response::{Embedding, ResourceType, StructuredResponse};
pub use store::{ConversationId, ConversationStore, ConversationSummary, Sender, StoredTurn};
pub use tool::{CallerContext, ToolInvocation, ToolResult};
