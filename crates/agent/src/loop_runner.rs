//! The orchestration loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use hydra_config::AppConfig;
use hydra_core::catalog::{KnowledgeBase, OrderStore, ProductCatalog, ProfileStore};
use hydra_core::event::{DomainEvent, EventBus};
use hydra_core::message::{Message, Transcript};
use hydra_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use hydra_core::response::StructuredResponse;
use hydra_core::store::{ConversationId, ConversationStore, Sender, StoredTurn};
use hydra_core::tool::{CallerContext, ToolInvocation, ToolResult};
use hydra_tools::{ToolBackends, ToolDispatcher, ToolName, tool_definitions};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::EngineLimits;
use crate::error::RunError;
use crate::prompt::system_prompt;
use crate::validator::validate;

/// The result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The validated response
    pub response: StructuredResponse,

    /// Everything the model saw and said during the run
    pub transcript: Transcript,

    /// Completion calls made
    pub iterations: usize,

    /// Tool invocations requested by the model
    pub tool_calls: usize,

    /// Whether the loop stopped at the iteration cap
    pub exhausted: bool,
}

#[derive(Debug, Default)]
struct Progress {
    iterations: usize,
    tool_calls: usize,
}

type MutationKey = (ToolName, String);

/// Successful mutating calls already made in this run.
#[derive(Default)]
struct MutationLedger {
    recorded: HashMap<MutationKey, ToolResult>,
}

impl MutationLedger {
    /// Only mutating tools get a key; everything else always runs.
    fn key(invocation: &ToolInvocation) -> Option<MutationKey> {
        let tool: ToolName = invocation.name.parse().ok()?;
        if !tool.is_mutating() {
            return None;
        }
        let raw = invocation.raw_arguments.trim();
        let args = if raw.is_empty() {
            "{}".to_string()
        } else {
            serde_json::from_str::<Value>(raw)
                .map(|v| canonical_json(&v))
                .unwrap_or_else(|_| raw.to_string())
        };
        Some((tool, args))
    }

    fn replay(&self, key: &MutationKey, call_id: &str) -> Option<ToolResult> {
        self.recorded.get(key).map(|prev| ToolResult {
            call_id: call_id.to_string(),
            payload: prev.payload.clone(),
            success: prev.success,
        })
    }

    /// A successful write supersedes every earlier write of the same tool.
    fn record(&mut self, key: MutationKey, result: &ToolResult) {
        if result.success {
            self.recorded.retain(|(tool, _), _| *tool != key.0);
            self.recorded.insert(key, result.clone());
        }
    }
}

/// JSON text with object keys sorted at every level.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

/// How one invocation of a turn gets its result.
enum Slot {
    Run,
    Replay(ToolResult),
    SameAs(usize),
}

/// The support agent: drives the model and the tools to one structured response.
pub struct SupportAgent {
    provider: Arc<dyn Provider>,
    dispatcher: ToolDispatcher,
    store: Arc<dyn ConversationStore>,
    event_bus: Arc<EventBus>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    history_limit: usize,
    completion_timeout: Duration,
    limits: EngineLimits,
    tools: Vec<ToolDefinition>,
}

impl SupportAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: ToolDispatcher,
        store: Arc<dyn ConversationStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            store,
            event_bus,
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: Some(1000),
            history_limit: 10,
            completion_timeout: Duration::from_secs(60),
            limits: EngineLimits::default(),
            tools: tool_definitions(),
        }
    }

    /// Wire an agent whose tools and history share one store.
    pub fn from_config<S>(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        store: Arc<S>,
        knowledge: Arc<dyn KnowledgeBase>,
        event_bus: Arc<EventBus>,
    ) -> Self
    where
        S: ConversationStore + ProductCatalog + OrderStore + ProfileStore + 'static,
    {
        let dispatcher = ToolDispatcher::new(ToolBackends::from_store(store.clone(), knowledge))
            .with_timeout(Duration::from_secs(config.agent.tool_timeout_secs));
        Self::new(provider, dispatcher, store, event_bus).with_config(config)
    }

    /// Take model, sampling, history and timeout settings from config.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.model = config.default_model.clone();
        self.temperature = config.default_temperature;
        self.max_tokens = Some(config.default_max_tokens);
        self.history_limit = config.agent.history_limit;
        self.completion_timeout = Duration::from_secs(config.agent.completion_timeout_secs);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set how many stored turns are replayed into each run.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Override the engine caps. Meant for tests.
    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> EngineLimits {
        self.limits
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Load history, run, and persist the exchange on success.
    pub async fn process(
        &self,
        conversation_id: &ConversationId,
        user_text: &str,
        caller: &CallerContext,
    ) -> Result<RunOutcome, RunError> {
        self.process_cancellable(conversation_id, user_text, caller, &CancellationToken::new())
            .await
    }

    /// Like [`process`](Self::process), aborting when `cancel` fires.
    pub async fn process_cancellable(
        &self,
        conversation_id: &ConversationId,
        user_text: &str,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        let history = self
            .store
            .load_recent_turns(conversation_id, self.history_limit)
            .await
            .inspect_err(|e| warn!(conversation_id = %conversation_id, "History load failed: {e}"))?;

        let outcome = self
            .run_cancellable(conversation_id, &history, user_text, caller, cancel)
            .await?;

        self.store
            .append_exchange(conversation_id, user_text, &outcome.response.to_json())
            .await
            .inspect_err(|e| warn!(conversation_id = %conversation_id, "Persisting exchange failed: {e}"))?;

        Ok(outcome)
    }

    /// Run the loop over already-loaded history. Nothing is persisted.
    pub async fn run(
        &self,
        conversation_id: &ConversationId,
        history: &[StoredTurn],
        user_text: &str,
        caller: &CallerContext,
    ) -> Result<RunOutcome, RunError> {
        self.run_cancellable(conversation_id, history, user_text, caller, &CancellationToken::new())
            .await
    }

    pub async fn run_cancellable(
        &self,
        conversation_id: &ConversationId,
        history: &[StoredTurn],
        user_text: &str,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        let started = Instant::now();
        info!(
            conversation_id = %conversation_id,
            history = history.len(),
            authenticated = caller.user_id().is_some(),
            "Starting run"
        );
        self.event_bus.publish(DomainEvent::RunStarted {
            conversation_id: conversation_id.to_string(),
            authenticated: caller.user_id().is_some(),
            timestamp: Utc::now(),
        });

        let mut progress = Progress::default();
        let result = self
            .drive(conversation_id, history, user_text, caller, cancel, &mut progress)
            .await;

        let outcome = match &result {
            Ok(outcome) => {
                info!(
                    conversation_id = %conversation_id,
                    kind = outcome.response.kind(),
                    iterations = progress.iterations,
                    tool_calls = progress.tool_calls,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Run finished"
                );
                outcome.response.kind()
            }
            Err(e) => {
                warn!(
                    conversation_id = %conversation_id,
                    class = e.class().as_str(),
                    iterations = progress.iterations,
                    tool_calls = progress.tool_calls,
                    "Run failed: {e}"
                );
                e.class().as_str()
            }
        };
        self.event_bus.publish(DomainEvent::RunFinished {
            conversation_id: conversation_id.to_string(),
            iterations: progress.iterations,
            tool_calls: progress.tool_calls,
            outcome: outcome.to_string(),
            timestamp: Utc::now(),
        });

        result
    }

    async fn drive(
        &self,
        conversation_id: &ConversationId,
        history: &[StoredTurn],
        user_text: &str,
        caller: &CallerContext,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<RunOutcome, RunError> {
        let mut transcript = self.seed_transcript(history, user_text, caller);
        let mut ledger = MutationLedger::default();

        loop {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }

            let response = self.complete(conversation_id, &transcript, cancel).await?;
            progress.iterations += 1;
            let message = response.message;

            if !message.has_tool_calls() {
                let raw = message.content.clone();
                transcript.push(message);
                let response = validate(&raw, &self.limits)?;
                return Ok(RunOutcome {
                    response,
                    transcript,
                    iterations: progress.iterations,
                    tool_calls: progress.tool_calls,
                    exhausted: false,
                });
            }

            // No completion would read results past the cap, so the last
            // tool-call turn is not dispatched.
            if progress.iterations >= self.limits.max_iterations {
                warn!(
                    conversation_id = %conversation_id,
                    iterations = progress.iterations,
                    "Iteration cap reached, validating last completion"
                );
                let raw = if message.content.trim().is_empty() {
                    "{}".to_string()
                } else {
                    message.content.clone()
                };
                transcript.push(message);
                let iterations = progress.iterations;
                return match validate(&raw, &self.limits) {
                    Ok(response) => Ok(RunOutcome {
                        response,
                        transcript,
                        iterations,
                        tool_calls: progress.tool_calls,
                        exhausted: true,
                    }),
                    Err(source) => Err(RunError::IterationsExhausted { iterations, source }),
                };
            }

            let invocations: Vec<ToolInvocation> = message
                .tool_calls
                .iter()
                .enumerate()
                .map(|(seq, call)| ToolInvocation::from_call(call, seq))
                .collect();
            transcript.push(message);
            progress.tool_calls += invocations.len();

            debug!(
                conversation_id = %conversation_id,
                iteration = progress.iterations,
                tool_count = invocations.len(),
                "Dispatching tool calls"
            );
            let results = self.dispatch_turn(&invocations, caller, &mut ledger, cancel).await?;
            for result in results {
                transcript.push(Message::tool_result(result.call_id, result.payload));
            }
        }
    }

    fn seed_transcript(&self, history: &[StoredTurn], user_text: &str, caller: &CallerContext) -> Transcript {
        let mut transcript = Transcript::new();
        transcript.push(Message::system(system_prompt(caller)));

        let skip = history.len().saturating_sub(self.history_limit);
        for turn in &history[skip..] {
            transcript.push(match turn.sender {
                Sender::User => Message::user(&turn.text),
                Sender::Ai => Message::assistant(&turn.text),
            });
        }

        transcript.push(Message::user(user_text));
        transcript
    }

    async fn complete(
        &self,
        conversation_id: &ConversationId,
        transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, RunError> {
        let mut request = ProviderRequest::new(&self.model, transcript.messages().to_vec());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request.tools = self.tools.clone();
        request.json_mode = true;

        let call = tokio::time::timeout(self.completion_timeout, self.provider.complete(request));
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            outcome = call => match outcome {
                Ok(result) => result?,
                Err(_) => {
                    return Err(RunError::CompletionTimeout(format!(
                        "no completion within {}s",
                        self.completion_timeout.as_secs()
                    )));
                }
            },
        };

        if let Some(usage) = response.usage {
            self.event_bus.publish(DomainEvent::ResponseGenerated {
                conversation_id: conversation_id.to_string(),
                model: response.model.clone(),
                tokens_used: usage.total_tokens,
                timestamp: Utc::now(),
            });
        }
        debug!(
            model = %response.model,
            tool_calls = response.message.tool_calls.len(),
            "Completion received"
        );
        Ok(response)
    }

    /// Dispatch one turn's invocations concurrently; results come back in request order.
    async fn dispatch_turn(
        &self,
        invocations: &[ToolInvocation],
        caller: &CallerContext,
        ledger: &mut MutationLedger,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolResult>, RunError> {
        let keys: Vec<Option<MutationKey>> = invocations.iter().map(MutationLedger::key).collect();

        let mut first_in_turn: HashMap<&MutationKey, usize> = HashMap::new();
        let mut slots = Vec::with_capacity(invocations.len());
        for (i, (invocation, key)) in invocations.iter().zip(&keys).enumerate() {
            let slot = match key {
                None => Slot::Run,
                Some(key) => {
                    if let Some(replayed) = ledger.replay(key, &invocation.id) {
                        debug!(tool = %invocation.name, "Replaying recorded mutation");
                        Slot::Replay(replayed)
                    } else if let Some(&first) = first_in_turn.get(key) {
                        Slot::SameAs(first)
                    } else {
                        first_in_turn.insert(key, i);
                        Slot::Run
                    }
                }
            };
            slots.push(slot);
        }

        let pending = invocations
            .iter()
            .zip(&slots)
            .filter(|(_, slot)| matches!(slot, Slot::Run))
            .map(|(invocation, _)| self.execute(invocation, caller));

        let mut executed = tokio::select! {
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            results = join_all(pending) => results.into_iter(),
        };

        let mut results: Vec<ToolResult> = Vec::with_capacity(invocations.len());
        for ((invocation, key), slot) in invocations.iter().zip(keys).zip(slots) {
            let result = match slot {
                Slot::Run => {
                    let Some(result) = executed.next() else {
                        return Err(RunError::Cancelled);
                    };
                    if let Some(key) = key {
                        ledger.record(key, &result);
                    }
                    result
                }
                Slot::Replay(result) => result,
                Slot::SameAs(first) => {
                    let prev = &results[first];
                    ToolResult {
                        call_id: invocation.id.clone(),
                        payload: prev.payload.clone(),
                        success: prev.success,
                    }
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    async fn execute(&self, invocation: &ToolInvocation, caller: &CallerContext) -> ToolResult {
        let started = Instant::now();
        let result = self.dispatcher.dispatch(invocation, caller).await;
        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: invocation.name.clone(),
            success: result.success,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::test_helpers::*;
    use async_trait::async_trait;
    use hydra_core::catalog::{Climate, KnowledgeTopic};
    use hydra_core::error::{ProviderError, StoreError};
    use hydra_core::message::Role;
    use hydra_store::{InMemoryStore, StaticKnowledge, seed_demo_data};
    use serde_json::json;

    const ANSWER: &str = r#"{"type":"answer","response":"Happy to help!"}"#;

    struct Harness {
        store: Arc<InMemoryStore>,
        bus: Arc<EventBus>,
    }

    impl Harness {
        async fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            seed_demo_data(store.as_ref(), false).await.unwrap();
            Self {
                store,
                bus: Arc::new(EventBus::default()),
            }
        }

        fn agent(&self, provider: Arc<dyn Provider>) -> SupportAgent {
            let backends = ToolBackends::from_store(self.store.clone(), Arc::new(StaticKnowledge));
            SupportAgent::new(
                provider,
                ToolDispatcher::new(backends),
                self.store.clone(),
                self.bus.clone(),
            )
        }

        async fn conversation(&self) -> ConversationId {
            self.store.create_conversation(None).await.unwrap()
        }
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
    async fn direct_answer_is_validated_and_persisted() {
        let h = Harness::new().await;
        let agent = h.agent(Arc::new(SequentialMockProvider::single_text(ANSWER)));
        let id = h.conversation().await;

        let outcome = agent.process(&id, "Hi there", &CallerContext::anonymous()).await.unwrap();
        assert_eq!(outcome.response, StructuredResponse::answer("Happy to help!"));
        assert_eq!(outcome.iterations, 1);
        // System + user + assistant
        assert_eq!(outcome.transcript.len(), 3);

        let turns = h.store.load_recent_turns(&id, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].sender, Sender::User);
        assert_eq!(turns[0].text, "Hi there");
        assert_eq!(turns[1].sender, Sender::Ai);
        assert_eq!(turns[1].text, outcome.response.to_json());
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_in_request_order() {
        let h = Harness::new().await;
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![
                make_tool_call("getShippingPolicy", json!({})),
                make_tool_call("getOrderById", json!({"orderId": "#ORD-22C56AE4"})),
                make_tool_call("getReturnsAndRefundsPolicy", json!({})),
            ],
            ANSWER,
        ));
        let agent = h.agent(provider.clone());
        let id = h.conversation().await;

        let outcome = agent.run(&id, &[], "Where is my order?", &CallerContext::anonymous()).await.unwrap();
        assert_eq!(outcome.tool_calls, 3);

        let tool_ids: Vec<_> = outcome
            .transcript
            .messages()
            .iter()
            .filter_map(|m| m.tool_call_id.clone())
            .collect();
        assert_eq!(tool_ids, ["call_getShippingPolicy", "call_getOrderById", "call_getReturnsAndRefundsPolicy"]);

        // The second completion sees the assistant turn and all three results
        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 2 + 1 + 3);
        assert!(second.json_mode);
        assert_eq!(second.tools.len(), ToolName::ALL.len());
    }

    #[tokio::test]
    async fn malformed_arguments_do_not_end_the_run() {
        let h = Harness::new().await;
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_raw_tool_call("c1", "getOrderById", "{\"orderId\": \"#ORD-")],
            ANSWER,
        ));
        let agent = h.agent(provider);
        let id = h.conversation().await;

        let outcome = agent.run(&id, &[], "order?", &CallerContext::anonymous()).await.unwrap();
        let payloads = tool_payloads(&outcome.transcript);
        assert_eq!(payloads[0]["error"], "invalid_arguments");
        assert_eq!(outcome.response.kind(), "answer");
    }

    #[tokio::test]
    async fn always_calling_model_stops_at_the_cap() {
        let h = Harness::new().await;
        let provider = Arc::new(RepeatingProvider::new(make_tool_call_response(
            vec![make_tool_call("listAllProducts", json!({}))],
            "",
        )));
        let agent = h.agent(provider.clone());
        let id = h.conversation().await;

        let err = agent.process(&id, "loop forever", &CallerContext::anonymous()).await.unwrap_err();
        assert_eq!(provider.call_count(), 5);
        assert_eq!(err.class(), ErrorClass::IterationExhausted);
        assert!(matches!(err, RunError::IterationsExhausted { iterations: 5, .. }));

        // Failed runs persist nothing
        assert!(h.store.load_recent_turns(&id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn usable_content_at_the_cap_is_accepted() {
        let h = Harness::new().await;
        let provider = Arc::new(RepeatingProvider::new(make_tool_call_response(
            vec![make_tool_call("listAllOrders", json!({}))],
            ANSWER,
        )));
        let agent = h.agent(provider.clone()).with_limits(EngineLimits {
            max_iterations: 2,
            ..EngineLimits::default()
        });
        let id = h.conversation().await;

        let outcome = agent.run(&id, &[], "orders", &CallerContext::anonymous()).await.unwrap();
        assert!(outcome.exhausted);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn non_json_final_turn_is_terminal() {
        let h = Harness::new().await;
        let agent = h.agent(Arc::new(SequentialMockProvider::single_text("Your order is on its way!")));
        let id = h.conversation().await;

        let err = agent.process(&id, "status?", &CallerContext::anonymous()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::TerminalValidation);
        assert!(!err.is_retryable());
        assert!(h.store.load_recent_turns(&id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_errors_are_classified_and_not_retried() {
        let h = Harness::new().await;
        let provider = Arc::new(SequentialMockProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 5,
        }));
        let agent = h.agent(provider.clone());
        let id = h.conversation().await;

        let err = agent.process(&id, "hi", &CallerContext::anonymous()).await.unwrap_err();
        assert!(matches!(err, RunError::RateLimited { .. }));
        assert!(err.is_retryable());
        assert_eq!(provider.call_count(), 1);
    }

    struct StalledProvider;

    #[async_trait]
    impl Provider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(make_text_response(ANSWER))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completion_timeout_is_transient() {
        let h = Harness::new().await;
        let agent = h
            .agent(Arc::new(StalledProvider))
            .with_completion_timeout(Duration::from_secs(30));
        let id = h.conversation().await;

        let err = agent.run(&id, &[], "hi", &CallerContext::anonymous()).await.unwrap_err();
        assert!(matches!(err, RunError::CompletionTimeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn cancelled_run_makes_no_calls() {
        let h = Harness::new().await;
        let provider = Arc::new(SequentialMockProvider::single_text(ANSWER));
        let agent = h.agent(provider.clone());
        let id = h.conversation().await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = agent
            .process_cancellable(&id, "hi", &CallerContext::anonymous(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Cancelled));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_pending_completion() {
        let h = Harness::new().await;
        let agent = h.agent(Arc::new(StalledProvider));
        let id = h.conversation().await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = agent
            .run_cancellable(&id, &[], "hi", &CallerContext::anonymous(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Cancelled);
    }

    #[tokio::test]
    async fn history_is_bounded_to_the_most_recent_turns() {
        let h = Harness::new().await;
        let id = h.conversation().await;
        for i in 0..8 {
            h.store
                .append_exchange(&id, &format!("question {i}"), &format!("answer {i}"))
                .await
                .unwrap();
        }
        let provider = Arc::new(SequentialMockProvider::single_text(ANSWER));
        let agent = h.agent(provider.clone()).with_history_limit(4);

        agent.process(&id, "latest", &CallerContext::anonymous()).await.unwrap();

        let request = &provider.requests()[0];
        let contents: Vec<_> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(&contents[1..], ["question 6", "answer 6", "question 7", "answer 7", "latest"]);
    }

    #[tokio::test]
    async fn identical_mutations_are_replayed_not_rewritten() {
        let h = Harness::new().await;
        let update = json!({"activityLevel": "active", "climate": "humid"});
        let reordered = json!({"climate": "humid", "activityLevel": "active"});
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_raw_tool_call("u1", "updateUserProfile", &update.to_string())], ""),
            make_tool_call_response(vec![make_raw_tool_call("u2", "updateUserProfile", &reordered.to_string())], ""),
            make_text_response(ANSWER),
        ]));
        let agent = h.agent(provider);
        let id = h.conversation().await;
        let mut events = h.bus.subscribe();

        let outcome = agent
            .run(&id, &[], "I moved somewhere humid", &CallerContext::authenticated("u-9"))
            .await
            .unwrap();

        let payloads = tool_payloads(&outcome.transcript);
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0], payloads[1]);

        let mut executed = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event.as_ref(), DomainEvent::ToolExecuted { .. }) {
                executed += 1;
            }
        }
        assert_eq!(executed, 1);
    }

    #[tokio::test]
    async fn a_superseded_write_is_executed_again() {
        let h = Harness::new().await;
        let humid = json!({"activityLevel": "active", "climate": "humid"}).to_string();
        let dry = json!({"activityLevel": "active", "climate": "dry"}).to_string();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_raw_tool_call("w1", "updateUserProfile", &humid)], ""),
            make_tool_call_response(vec![make_raw_tool_call("w2", "updateUserProfile", &dry)], ""),
            make_tool_call_response(vec![make_raw_tool_call("w3", "updateUserProfile", &humid)], ""),
            make_text_response(ANSWER),
        ]));
        let agent = h.agent(provider);
        let id = h.conversation().await;
        let mut events = h.bus.subscribe();

        let outcome = agent
            .run(&id, &[], "Actually, humid after all", &CallerContext::authenticated("u1"))
            .await
            .unwrap();

        let payloads = tool_payloads(&outcome.transcript);
        assert_eq!(payloads.len(), 3);
        assert_eq!(payloads[2]["climate"], "humid");

        let mut executed = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event.as_ref(), DomainEvent::ToolExecuted { .. }) {
                executed += 1;
            }
        }
        assert_eq!(executed, 3);

        let profile = h.store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.climate, Climate::Humid);
    }

    struct SlowKnowledge;

    #[async_trait]
    impl KnowledgeBase for SlowKnowledge {
        async fn fetch(&self, _topic: KnowledgeTopic) -> Result<String, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("slow".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_turns_tools_run_concurrently() {
        let h = Harness::new().await;
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![
                make_tool_call("getAppPurpose", json!({})),
                make_tool_call("getShippingPolicy", json!({})),
                make_tool_call("getCompanyInformation", json!({})),
            ],
            ANSWER,
        ));
        let backends = ToolBackends::from_store(h.store.clone(), Arc::new(SlowKnowledge));
        let agent = SupportAgent::new(provider, ToolDispatcher::new(backends), h.store.clone(), h.bus.clone());
        let id = h.conversation().await;

        let started = tokio::time::Instant::now();
        let outcome = agent.run(&id, &[], "Tell me everything", &CallerContext::anonymous()).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.tool_calls, 3);
        assert!(tool_payloads(&outcome.transcript).iter().all(|p| p["content"] == "slow"));
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(15), "tools ran one after another: {elapsed:?}");
    }

    struct BrokenKnowledge;

    #[async_trait]
    impl KnowledgeBase for BrokenKnowledge {
        async fn fetch(&self, _topic: KnowledgeTopic) -> Result<String, StoreError> {
            Err(StoreError::QueryFailed("disk I/O error".into()))
        }
    }

    #[tokio::test]
    async fn backend_failures_are_fed_back_and_the_run_continues() {
        let h = Harness::new().await;
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("getShippingPolicy", json!({}))],
            ANSWER,
        ));
        let backends = ToolBackends::from_store(h.store.clone(), Arc::new(BrokenKnowledge));
        let agent = SupportAgent::new(provider.clone(), ToolDispatcher::new(backends), h.store.clone(), h.bus.clone());
        let id = h.conversation().await;

        let outcome = agent.run(&id, &[], "How fast do you ship?", &CallerContext::anonymous()).await.unwrap();

        assert_eq!(tool_payloads(&outcome.transcript)[0]["error"], "execution_failed");
        assert_eq!(outcome.response, StructuredResponse::answer("Happy to help!"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn anonymous_profile_calls_get_missing_identity() {
        let h = Harness::new().await;
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("getUserProfile", json!({"userId": "admin"}))],
            ANSWER,
        ));
        let agent = h.agent(provider);
        let id = h.conversation().await;

        let outcome = agent.run(&id, &[], "my hydration?", &CallerContext::anonymous()).await.unwrap();
        assert_eq!(tool_payloads(&outcome.transcript)[0]["error"], "missing_identity");
    }

    #[tokio::test]
    async fn run_events_bracket_the_run() {
        let h = Harness::new().await;
        let agent = h.agent(Arc::new(SequentialMockProvider::single_text(ANSWER)));
        let id = h.conversation().await;
        let mut events = h.bus.subscribe();

        agent.run(&id, &[], "hi", &CallerContext::anonymous()).await.unwrap();

        let first = events.try_recv().unwrap();
        assert!(matches!(first.as_ref(), DomainEvent::RunStarted { authenticated: false, .. }));
        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event);
        }
        match last.as_deref() {
            Some(DomainEvent::RunFinished { outcome, iterations, .. }) => {
                assert_eq!(outcome, "answer");
                assert_eq!(*iterations, 1);
            }
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[test]
    fn canonical_json_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"d":2,"c":[3,{"f":4,"e":5}]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"c":[3,{"e":5,"f":4}],"d":2},"b":1}"#).unwrap();
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }
}
