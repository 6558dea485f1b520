//! End-to-end support scenarios.
//!
//! Each test wires the real tool dispatcher and the in-memory store with
//! seeded demo data behind a scripted provider, then runs one user turn
//! through `SupportAgent::process`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hydra_agent::test_helpers::*;
use hydra_agent::{ErrorClass, RunError, SupportAgent};
use hydra_core::catalog::{Order, OrderRef, OrderStore, OrderWithItems, ProfileStore};
use hydra_core::error::StoreError;
use hydra_core::event::EventBus;
use hydra_core::message::{Role, Transcript};
use hydra_core::response::{ResourceType, StructuredResponse};
use hydra_core::store::{ConversationStore, Sender};
use hydra_core::provider::Provider;
use hydra_core::tool::CallerContext;
use hydra_store::seed::{COPPER_ID, MIDNIGHT_ID, SHIPPED_ORDER_ID, TITAN_ID};
use hydra_store::{InMemoryStore, StaticKnowledge, seed_demo_data};
use hydra_tools::{ToolBackends, ToolDispatcher};
use serde_json::{Value, json};

async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    seed_demo_data(store.as_ref(), false).await.unwrap();
    store
}

fn agent_over(store: Arc<InMemoryStore>, provider: Arc<dyn Provider>) -> SupportAgent {
    let dispatcher = ToolDispatcher::new(ToolBackends::from_store(store.clone(), Arc::new(StaticKnowledge)));
    SupportAgent::new(provider, dispatcher, store, Arc::new(EventBus::default()))
}

fn tool_payloads(transcript: &Transcript) -> Vec<Value> {
    transcript
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| serde_json::from_str(&m.content).unwrap())
        .collect()
}

#[tokio::test]
async fn order_lookup_by_short_reference_answers_with_an_order_card() {
    let store = seeded_store().await;
    let answer = json!({
        "type": "answer",
        "response": "Your order #ORD-22C56AE4 has shipped.",
        "embeddings": [{"type": "order", "id": SHIPPED_ORDER_ID.to_string()}],
    })
    .to_string();
    let provider = Arc::new(SequentialMockProvider::tool_then_answer(
        vec![make_tool_call("getOrderById", json!({"orderId": "#ORD-22C56AE4"}))],
        &answer,
    ));
    let agent = agent_over(store.clone(), provider.clone());
    let id = store.create_conversation(None).await.unwrap();

    let outcome = agent
        .process(&id, "Where is order #ORD-22C56AE4?", &CallerContext::anonymous())
        .await
        .unwrap();

    let payloads = tool_payloads(&outcome.transcript);
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["id"], SHIPPED_ORDER_ID.to_string());
    assert_eq!(payloads[0]["items"].as_array().unwrap().len(), 2);

    match &outcome.response {
        StructuredResponse::Answer { embeddings, .. } => {
            assert_eq!(embeddings.len(), 1);
            assert_eq!(embeddings[0].kind, ResourceType::Order);
            assert_eq!(embeddings[0].id, SHIPPED_ORDER_ID.to_string());
        }
        other => panic!("expected an answer, got {other:?}"),
    }
    assert_eq!(provider.call_count(), 2);

    let turns = store.load_recent_turns(&id, 10).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].sender, Sender::Ai);
    assert_eq!(turns[1].text, outcome.response.to_json());
}

#[tokio::test]
async fn vague_product_request_ends_in_an_ambiguity() {
    let store = seeded_store().await;
    let ids = [TITAN_ID, COPPER_ID, MIDNIGHT_ID].map(|id| id.to_string());
    let ambiguity = json!({
        "type": "ambiguity",
        "response": "Which bottle did you mean?",
        "id_array": ids,
        "resourceType": "product",
    })
    .to_string();
    let provider = Arc::new(SequentialMockProvider::tool_then_answer(
        vec![make_tool_call("searchProducts", json!({"query": "bottle"}))],
        &ambiguity,
    ));
    let agent = agent_over(store.clone(), provider);
    let id = store.create_conversation(None).await.unwrap();

    let outcome = agent
        .process(&id, "Tell me about the bottle", &CallerContext::anonymous())
        .await
        .unwrap();

    match outcome.response {
        StructuredResponse::Ambiguity {
            id_array,
            resource_type,
            ..
        } => {
            assert_eq!(resource_type, ResourceType::Product);
            assert_eq!(id_array, ids);
        }
        other => panic!("expected an ambiguity, got {other:?}"),
    }
}

/// Order backend that never answers in time.
struct StalledOrders;

#[async_trait]
impl OrderStore for StalledOrders {
    async fn find_order(&self, _reference: &OrderRef) -> Result<Option<OrderWithItems>, StoreError> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Ok(None)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn slow_order_backend_degrades_to_a_graceful_answer() {
    let store = seeded_store().await;
    let backends = ToolBackends {
        products: store.clone(),
        orders: Arc::new(StalledOrders),
        profiles: store.clone(),
        knowledge: Arc::new(StaticKnowledge),
    };
    let dispatcher = ToolDispatcher::new(backends).with_timeout(Duration::from_secs(2));
    let answer = r#"{"type":"answer","response":"I couldn't reach the order system. Please try again shortly."}"#;
    let provider = Arc::new(SequentialMockProvider::tool_then_answer(
        vec![make_tool_call("getOrderById", json!({"orderId": "#ORD-22C56AE4"}))],
        answer,
    ));
    let agent = SupportAgent::new(provider.clone(), dispatcher, store.clone(), Arc::new(EventBus::default()));
    let id = store.create_conversation(None).await.unwrap();

    let outcome = agent
        .process(&id, "Where is my order?", &CallerContext::anonymous())
        .await
        .unwrap();

    let payloads = tool_payloads(&outcome.transcript);
    assert_eq!(payloads[0]["error"], "timeout");
    assert!(outcome.response.text().contains("try again"));

    // The model saw the timeout before answering
    let second = &provider.requests()[1];
    let fed_back = second.messages.last().unwrap();
    assert_eq!(fed_back.role, Role::Tool);
    assert!(fed_back.content.contains("timeout"));
}

#[tokio::test]
async fn prose_output_is_rejected_with_a_safe_message() {
    let store = seeded_store().await;
    let provider = Arc::new(SequentialMockProvider::single_text("Sure! Your order is on its way."));
    let agent = agent_over(store.clone(), provider.clone());
    let id = store.create_conversation(None).await.unwrap();

    let err = agent
        .process(&id, "Where is my order?", &CallerContext::anonymous())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::InvalidResponse(_)));
    assert_eq!(err.class(), ErrorClass::TerminalValidation);
    assert!(!err.is_retryable());
    assert!(!err.user_message().contains("Sure!"));
    assert_eq!(provider.call_count(), 1);
    assert!(store.load_recent_turns(&id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn profile_tools_act_only_for_the_signed_in_caller() {
    let store = seeded_store().await;
    let provider = Arc::new(SequentialMockProvider::tool_then_answer(
        vec![make_tool_call(
            "updateUserProfile",
            json!({"activityLevel": "active", "climate": "dry", "userId": "someone-else"}),
        )],
        r#"{"type":"answer","response":"Saved your preferences."}"#,
    ));
    let agent = agent_over(store.clone(), provider);
    let id = store.create_conversation(Some("user-7")).await.unwrap();

    let outcome = agent
        .process(&id, "I run a lot and live somewhere dry", &CallerContext::authenticated("user-7"))
        .await
        .unwrap();
    assert_eq!(outcome.response.kind(), "answer");

    assert!(store.get_profile("user-7").await.unwrap().is_some());
    assert!(store.get_profile("someone-else").await.unwrap().is_none());
}
