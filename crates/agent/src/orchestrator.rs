//! The agent orchestration loop.
//!
//! One [`Orchestrator`] owns one conversation. Each user turn runs
//! `ask model -> maybe execute tools -> re-ask` until the model answers
//! with text or the iteration ceiling is hit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use codewright_config::AppConfig;
use codewright_core::error::{Error, ProviderError};
use codewright_core::event::{DomainEvent, EventBus};
use codewright_core::message::{Conversation, Message, MessageToolCall};
use codewright_core::provider::{Provider, ProviderRequest};
use codewright_core::tool::ToolOrigin;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::executor::{ToolExecution, ToolExecutor};
use crate::surface::{Catalog, ToolSurface};

/// Reply text when a turn hits the iteration ceiling.
pub const LIMIT_REACHED_TEXT: &str =
    "Reached the maximum number of iterations. Try simplifying the request.";

const DEFAULT_MAX_ITERATIONS: u32 = 20;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);
const PREVIEW_CHARS: usize = 200;

/// Where the orchestrator is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingModel,
    ExecutingTools,
    Done,
    LimitReached,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final answer
    Completed,
    /// The iteration ceiling was hit
    LimitReached,
}

/// The result of one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    pub outcome: TurnOutcome,
    /// Model round-trips performed
    pub iterations: u32,
}

pub struct OrchestratorBuilder {
    provider: Arc<dyn Provider>,
    surface: ToolSurface,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
    system_prompt: String,
    parallel_tool_calls: bool,
    tool_timeout: Duration,
    event_bus: Option<Arc<EventBus>>,
    conversation: Option<Conversation>,
}

impl OrchestratorBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Maximum model round-trips per turn.
    pub fn max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Run the calls of one reply concurrently. Results are still recorded
    /// in emission order.
    pub fn parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Continue an existing conversation instead of starting a new one.
    pub fn conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = Some(conversation);
        self
    }

    /// Take model, sampling and loop settings from configuration.
    pub fn configure(self, config: &AppConfig) -> Self {
        self.model(&config.llm.model)
            .temperature(config.llm.temperature)
            .max_tokens(config.llm.max_tokens)
            .max_iterations(config.agent.max_iterations)
            .system_prompt(&config.agent.system_prompt)
            .parallel_tool_calls(config.agent.parallel_tool_calls)
            .tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs))
    }

    /// Build the orchestrator.
    ///
    /// The tool catalog is built once here so that a duplicate tool name is
    /// reported before any turn runs.
    pub async fn build(self) -> Result<Orchestrator, Error> {
        if self.max_iterations == 0 {
            return Err(Error::Config {
                message: "max_iterations must be at least 1".into(),
            });
        }

        let catalog = self.surface.catalog().await?;
        let executor = ToolExecutor::new(
            self.surface.local().clone(),
            self.surface.remote().cloned(),
        )
        .with_timeout(self.tool_timeout);

        info!(
            provider = self.provider.name(),
            model = %self.model,
            tools = catalog.len(),
            max_iterations = self.max_iterations,
            "Orchestrator ready"
        );

        Ok(Orchestrator {
            provider: self.provider,
            surface: self.surface,
            executor,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_iterations: self.max_iterations,
            system_prompt: self.system_prompt,
            parallel_tool_calls: self.parallel_tool_calls,
            event_bus: self.event_bus.unwrap_or_default(),
            conversation: self.conversation.unwrap_or_default(),
            state: TurnState::Idle,
            catalog,
        })
    }
}

/// Drives user turns over one conversation.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    surface: ToolSurface,
    executor: ToolExecutor,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
    system_prompt: String,
    parallel_tool_calls: bool,
    event_bus: Arc<EventBus>,
    conversation: Conversation,
    state: TurnState,
    /// The catalog offered on the most recent model request
    catalog: Catalog,
}

impl Orchestrator {
    pub fn builder(provider: Arc<dyn Provider>, surface: ToolSurface) -> OrchestratorBuilder {
        OrchestratorBuilder {
            provider,
            surface,
            model: "gpt-4o".into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: codewright_config::DEFAULT_SYSTEM_PROMPT.into(),
            parallel_tool_calls: false,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            event_bus: None,
            conversation: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Process one user message and return the reply text.
    pub async fn process_user_request(&mut self, text: impl Into<String>) -> Result<String, Error> {
        let reply = self.process_turn(text, &CancellationToken::new()).await?;
        Ok(reply.text)
    }

    /// Process one user message.
    ///
    /// `cancel` is checked before every model request. A cancelled turn
    /// returns [`Error::Cancelled`] and leaves every tool call it recorded
    /// answered.
    pub async fn process_turn(
        &mut self,
        text: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, Error> {
        let conversation_id = self.conversation.id.to_string();
        info!(
            conversation_id = %conversation_id,
            messages = self.conversation.len(),
            "Processing user turn"
        );
        self.event_bus.publish(DomainEvent::TurnStarted {
            conversation_id: conversation_id.clone(),
            timestamp: Utc::now(),
        });

        if self.conversation.seed_system_prompt(self.system_prompt.clone()) {
            debug!(conversation_id = %conversation_id, "System prompt seeded");
        }
        self.conversation.append(Message::user(text));

        let result = self.run_loop(&conversation_id, cancel).await;
        match &result {
            Ok(reply) => {
                self.event_bus.publish(DomainEvent::TurnFinished {
                    conversation_id,
                    iterations: reply.iterations,
                    limit_reached: reply.outcome == TurnOutcome::LimitReached,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Turn failed");
                self.state = TurnState::Idle;
            }
        }
        result
    }

    async fn run_loop(
        &mut self,
        conversation_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, Error> {
        let mut iteration: u32 = 0;

        loop {
            if iteration >= self.max_iterations {
                warn!(
                    conversation_id = %conversation_id,
                    iterations = iteration,
                    "Iteration ceiling reached"
                );
                self.state = TurnState::LimitReached;
                self.conversation.append(Message::assistant(LIMIT_REACHED_TEXT));
                return Ok(TurnReply {
                    text: LIMIT_REACHED_TEXT.into(),
                    outcome: TurnOutcome::LimitReached,
                    iterations: iteration,
                });
            }

            if cancel.is_cancelled() {
                info!(conversation_id = %conversation_id, iterations = iteration, "Turn cancelled");
                return Err(Error::Cancelled);
            }

            iteration += 1;
            self.state = TurnState::AwaitingModel;
            self.refresh_catalog().await?;

            debug!(conversation_id = %conversation_id, iteration, "Requesting model reply");
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: self.conversation.snapshot(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: self.catalog.descriptors().to_vec(),
            };
            let response = self.provider.complete(request).await?;

            self.event_bus.publish(DomainEvent::ModelResponded {
                conversation_id: conversation_id.to_string(),
                iteration,
                tool_calls: response.message.tool_calls.len(),
                tokens_used: response.usage.as_ref().map(|u| u.total_tokens),
                timestamp: Utc::now(),
            });

            if !response.requests_tools() {
                let text = response.message.content.clone();
                if text.trim().is_empty() {
                    warn!(conversation_id = %conversation_id, iteration, "Model returned an empty final answer");
                    return Err(ProviderError::EmptyCompletion.into());
                }
                self.conversation.append(response.message);
                self.state = TurnState::Done;
                return Ok(TurnReply {
                    text,
                    outcome: TurnOutcome::Completed,
                    iterations: iteration,
                });
            }

            self.state = TurnState::ExecutingTools;
            let calls = response.message.tool_calls.clone();
            debug!(tool_count = calls.len(), "Executing tool calls");
            self.conversation.append(response.message);
            self.execute_calls(&calls).await;
        }
    }

    /// Rebuild the catalog for the next request and surface any degradation.
    async fn refresh_catalog(&mut self) -> Result<(), Error> {
        let catalog = self.surface.catalog().await?;
        for reason in catalog.warnings() {
            self.event_bus.publish(DomainEvent::CatalogDegraded {
                reason: reason.clone(),
                timestamp: Utc::now(),
            });
        }
        self.catalog = catalog;
        Ok(())
    }

    /// Answer every call of one reply, appending results in emission order.
    async fn execute_calls(&mut self, calls: &[MessageToolCall]) {
        if self.parallel_tool_calls && calls.len() > 1 {
            let executions = join_all(
                calls
                    .iter()
                    .map(|call| self.executor.execute(call, &self.catalog)),
            )
            .await;
            for (call, execution) in calls.iter().zip(executions) {
                self.record(call, execution);
            }
        } else {
            for call in calls {
                let execution = self.executor.execute(call, &self.catalog).await;
                self.record(call, execution);
            }
        }
    }

    fn record(&mut self, call: &MessageToolCall, execution: ToolExecution) {
        self.event_bus.publish(DomainEvent::ToolExecuted {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            origin: execution.route.map(ToolOrigin::from),
            success: execution.success,
            result_preview: preview(&execution.message.content),
            duration_ms: execution.duration.as_millis() as u64,
            timestamp: Utc::now(),
        });
        self.conversation.append(execution.message);
    }
}

/// The first [`PREVIEW_CHARS`] characters of a tool payload.
fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        EchoTool, FailingTool, MockRemote, ScriptedProvider, SleepyTool, call, descriptor,
        text_reply, tool_reply,
    };
    use codewright_core::message::Role;
    use codewright_core::tool::ToolRegistry;
    use serde_json::json;

    fn local_tools() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(FailingTool));
        registry.register(Box::new(SleepyTool));
        Arc::new(registry)
    }

    fn surface() -> ToolSurface {
        ToolSurface::new(local_tools(), None)
    }

    async fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
        Orchestrator::builder(provider, surface())
            .system_prompt("You are a test agent.")
            .build()
            .await
            .unwrap()
    }

    fn roles(conversation: &Conversation) -> Vec<Role> {
        conversation.messages().iter().map(|m| m.role).collect()
    }

    fn payload(message: &Message) -> serde_json::Value {
        serde_json::from_str(&message.content).unwrap()
    }

    #[tokio::test]
    async fn text_only_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("Hi there!")]));
        let mut agent = orchestrator(provider.clone()).await;

        let reply = agent.process_user_request("hello").await.unwrap();

        assert_eq!(reply, "Hi there!");
        assert_eq!(
            roles(agent.conversation()),
            vec![Role::System, Role::User, Role::Assistant]
        );
        assert_eq!(agent.state(), TurnState::Done);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn second_turn_grows_by_two() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            text_reply("first"),
            text_reply("second"),
        ]));
        let mut agent = orchestrator(provider).await;

        agent.process_user_request("one").await.unwrap();
        let before = agent.conversation().len();
        let reply = agent.process_user_request("two").await.unwrap();

        assert_eq!(reply, "second");
        assert_eq!(agent.conversation().len(), before + 2);
    }

    #[tokio::test]
    async fn tool_call_then_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![call("c1", "echo", json!({"text": "123.txt"}))]),
            text_reply("Created 123.txt"),
        ]));
        let mut agent = orchestrator(provider.clone()).await;
        let reply = agent.process_turn("create file 123.txt", &CancellationToken::new()).await.unwrap();

        assert_eq!(reply.text, "Created 123.txt");
        assert_eq!(reply.outcome, TurnOutcome::Completed);
        assert_eq!(reply.iterations, 2);

        let messages = agent.conversation().messages();
        assert_eq!(
            roles(agent.conversation()),
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(payload(&messages[3])["status"], "success");

        let requests = provider.requests();
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[0].tools.len(), 3);
    }

    #[tokio::test]
    async fn ceiling_of_one_stops_after_single_call() {
        let provider = Arc::new(ScriptedProvider::always(tool_reply(vec![call(
            "c1",
            "echo",
            json!({"text": "again"}),
        )])));
        let mut agent = Orchestrator::builder(provider.clone(), surface())
            .max_iterations(1)
            .build()
            .await
            .unwrap();

        let reply = agent.process_turn("loop forever", &CancellationToken::new()).await.unwrap();

        assert_eq!(reply.text, LIMIT_REACHED_TEXT);
        assert_eq!(reply.outcome, TurnOutcome::LimitReached);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(agent.state(), TurnState::LimitReached);

        let last = agent.conversation().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, LIMIT_REACHED_TEXT);
        assert!(agent.conversation().unanswered_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn round_trips_never_exceed_ceiling() {
        for ceiling in [2, 5] {
            let provider = Arc::new(ScriptedProvider::always(tool_reply(vec![call(
                "c",
                "echo",
                json!({"text": "x"}),
            )])));
            let mut agent = Orchestrator::builder(provider.clone(), surface())
                .max_iterations(ceiling)
                .build()
                .await
                .unwrap();
            let reply = agent.process_turn("go", &CancellationToken::new()).await.unwrap();
            assert_eq!(provider.call_count(), ceiling as usize);
            assert_eq!(reply.iterations, ceiling);
        }
    }

    #[tokio::test]
    async fn system_prompt_seeded_once() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("a"), text_reply("b")]));
        let mut agent = orchestrator(provider).await;
        agent.process_user_request("one").await.unwrap();
        agent.process_user_request("two").await.unwrap();

        let systems = agent
            .conversation()
            .messages()
            .iter()
            .filter(|m| m.role == Role::System)
            .count();
        assert_eq!(systems, 1);
        assert_eq!(agent.conversation().messages()[0].content, "You are a test agent.");
    }

    #[tokio::test]
    async fn non_empty_history_gets_no_system_prompt() {
        let mut history = Conversation::new();
        history.append(Message::user("earlier"));
        history.append(Message::assistant("earlier answer"));

        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("ok")]));
        let mut agent = Orchestrator::builder(provider, surface())
            .conversation(history)
            .build()
            .await
            .unwrap();
        agent.process_user_request("now").await.unwrap();

        assert!(agent.conversation().messages().iter().all(|m| m.role != Role::System));
        assert_eq!(agent.conversation().len(), 4);
    }

    #[tokio::test]
    async fn calls_answered_in_emission_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![
                call("a", "echo", json!({"text": "first"})),
                call("b", "explode", json!({})),
                call("c", "echo", json!({"text": "third"})),
            ]),
            text_reply("done"),
        ]));
        let mut agent = orchestrator(provider).await;
        agent.process_user_request("three calls").await.unwrap();

        let messages = agent.conversation().messages();
        let ids: Vec<_> = messages[3..6]
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(agent.conversation().unanswered_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn parallel_calls_recorded_in_emission_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![
                call("slow", "sleepy", json!({"ms": 80})),
                call("fast", "sleepy", json!({"ms": 1})),
            ]),
            text_reply("done"),
        ]));
        let mut agent = Orchestrator::builder(provider, surface())
            .parallel_tool_calls(true)
            .build()
            .await
            .unwrap();
        agent.process_user_request("race").await.unwrap();

        let messages = agent.conversation().messages();
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("slow"));
        assert_eq!(payload(&messages[3])["result"], "slept 80");
        assert_eq!(messages[4].tool_call_id.as_deref(), Some("fast"));
    }

    #[tokio::test]
    async fn failing_tool_does_not_abort_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![call("c1", "explode", json!({}))]),
            text_reply("That tool failed, sorry."),
        ]));
        let mut agent = orchestrator(provider.clone()).await;

        let reply = agent.process_user_request("try it").await.unwrap();
        assert_eq!(reply, "That tool failed, sorry.");

        let tool_message = &agent.conversation().messages()[3];
        assert_eq!(payload(tool_message)["status"], "error");
        // the model saw the error payload
        let seen = &provider.requests()[1].messages[3];
        assert_eq!(seen.content, tool_message.content);
    }

    #[tokio::test]
    async fn always_failing_tool_hits_ceiling() {
        let provider = Arc::new(ScriptedProvider::always(tool_reply(vec![call(
            "c",
            "explode",
            json!({}),
        )])));
        let mut agent = Orchestrator::builder(provider, surface())
            .max_iterations(3)
            .build()
            .await
            .unwrap();
        let reply = agent.process_user_request("break").await.unwrap();
        assert_eq!(reply, LIMIT_REACHED_TEXT);
        assert!(agent.conversation().unanswered_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_arguments_are_fed_back() {
        let mut bad = call("c1", "echo", json!({}));
        bad.arguments = "{not json".into();
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![bad]),
            text_reply("fixed"),
        ]));
        let mut agent = orchestrator(provider).await;
        assert_eq!(agent.process_user_request("go").await.unwrap(), "fixed");
        let body = payload(&agent.conversation().messages()[3]);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn transport_error_leaves_history_consistent() {
        let provider = Arc::new(ScriptedProvider::with_results(vec![
            Ok(tool_reply(vec![call("c1", "echo", json!({"text": "hi"}))])),
            Err(ProviderError::Network("connection refused".into())),
        ]));
        let mut agent = orchestrator(provider).await;

        let err = agent.process_user_request("go").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
        assert_eq!(agent.state(), TurnState::Idle);
        assert!(agent.conversation().unanswered_tool_calls().is_empty());
        assert_eq!(agent.conversation().last().unwrap().role, Role::Tool);
    }

    #[tokio::test]
    async fn empty_final_answer_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("")]));
        let mut agent = orchestrator(provider).await;

        let err = agent.process_turn("hello", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::EmptyCompletion)));
        assert_eq!(agent.state(), TurnState::Idle);
        // Only the system prompt and the user message were recorded
        assert_eq!(roles(agent.conversation()), vec![Role::System, Role::User]);
    }

    #[tokio::test]
    async fn empty_answer_after_tools_keeps_results() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![call("c1", "echo", json!({"text": "hi"}))]),
            text_reply("   "),
        ]));
        let mut agent = orchestrator(provider).await;

        let err = agent.process_user_request("go").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::EmptyCompletion)));
        assert_eq!(agent.conversation().last().unwrap().role, Role::Tool);
        assert!(agent.conversation().unanswered_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_first_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("never")]));
        let mut agent = orchestrator(provider.clone()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = agent.process_turn("hello", &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(provider.call_count(), 0);
        assert_eq!(agent.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn duplicate_tool_fails_build() {
        let remote = Arc::new(MockRemote::with_tools(vec![descriptor("echo")]));
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = Orchestrator::builder(provider.clone(), ToolSurface::new(local_tools(), Some(remote)))
            .build()
            .await;
        assert!(matches!(result, Err(Error::DuplicateTool { .. })));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn zero_ceiling_is_rejected() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = Orchestrator::builder(provider, surface())
            .max_iterations(0)
            .build()
            .await;
        assert!(matches!(result, Err(e) if e.is_configuration()));
    }

    #[tokio::test]
    async fn remote_tool_added_later_collides_mid_session() {
        let remote = Arc::new(MockRemote::with_tools(vec![descriptor("srv__ok")]));
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("fine")]));
        let mut agent = Orchestrator::builder(
            provider.clone(),
            ToolSurface::new(local_tools(), Some(remote.clone())),
        )
        .build()
        .await
        .unwrap();

        remote.set_tools(vec![descriptor("echo")]);
        let err = agent.process_user_request("go").await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn remote_tools_are_offered_and_routed() {
        let remote = Arc::new(MockRemote::with_tools(vec![descriptor("srv__ping")]));
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![call("r1", "srv__ping", json!({}))]),
            text_reply("pong received"),
        ]));
        let mut agent = Orchestrator::builder(
            provider.clone(),
            ToolSurface::new(local_tools(), Some(remote.clone())),
        )
        .build()
        .await
        .unwrap();

        agent.process_user_request("ping").await.unwrap();
        assert_eq!(remote.calls(), vec!["srv__ping"]);
        assert!(provider.requests()[0].tools.iter().any(|t| t.name == "srv__ping"));
    }

    #[tokio::test]
    async fn degraded_catalog_still_answers() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("local only")]));
        let mut agent = Orchestrator::builder(
            provider.clone(),
            ToolSurface::new(local_tools(), Some(Arc::new(MockRemote::failing()))),
        )
        .event_bus(bus)
        .build()
        .await
        .unwrap();

        assert_eq!(agent.process_user_request("hi").await.unwrap(), "local only");
        assert!(agent.catalog().is_degraded());
        assert_eq!(provider.requests()[0].tools.len(), 3);

        let mut degraded = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event.as_ref(), DomainEvent::CatalogDegraded { .. }) {
                degraded = true;
            }
        }
        assert!(degraded);
    }

    #[tokio::test]
    async fn publishes_turn_events() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![call("c1", "echo", json!({"text": "x"}))]),
            text_reply("done"),
        ]));
        let mut agent = Orchestrator::builder(provider, surface())
            .event_bus(bus)
            .build()
            .await
            .unwrap();
        agent.process_user_request("go").await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                DomainEvent::TurnStarted { .. } => "started",
                DomainEvent::ModelResponded { .. } => "model",
                DomainEvent::ToolExecuted {
                    call_id,
                    tool_name,
                    arguments,
                    origin,
                    success,
                    result_preview,
                    ..
                } => {
                    assert_eq!(call_id, "c1");
                    assert_eq!(tool_name, "echo");
                    assert_eq!(arguments, r#"{"text":"x"}"#);
                    assert_eq!(*origin, Some(ToolOrigin::Local));
                    assert!(*success);
                    assert!(result_preview.contains("success"));
                    "tool"
                }
                DomainEvent::CatalogDegraded { .. } => "degraded",
                DomainEvent::TurnFinished { iterations, limit_reached, .. } => {
                    assert_eq!(*iterations, 2);
                    assert!(!limit_reached);
                    "finished"
                }
            });
        }
        assert_eq!(kinds, vec!["started", "model", "tool", "model", "finished"]);
    }

    #[tokio::test]
    async fn replay_is_deterministic() {
        let script = || {
            vec![
                tool_reply(vec![
                    call("a", "echo", json!({"text": "one"})),
                    call("b", "explode", json!({})),
                ]),
                text_reply("all done"),
            ]
        };
        let mut transcripts = Vec::new();
        for _ in 0..2 {
            let provider = Arc::new(ScriptedProvider::new(script()));
            let mut agent = orchestrator(provider).await;
            let reply = agent.process_user_request("go").await.unwrap();
            let transcript: Vec<_> = agent
                .conversation()
                .messages()
                .iter()
                .map(|m| (m.role, m.content.clone(), m.tool_call_id.clone()))
                .collect();
            transcripts.push((reply, transcript));
        }
        assert_eq!(transcripts[0], transcripts[1]);
    }

    #[tokio::test]
    async fn configure_reads_settings() {
        let mut config = AppConfig::default();
        config.llm.model = "test-model".into();
        config.agent.max_iterations = 7;
        config.agent.system_prompt = "Configured prompt".into();

        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("ok")]));
        let mut agent = Orchestrator::builder(provider.clone(), surface())
            .configure(&config)
            .build()
            .await
            .unwrap();
        assert_eq!(agent.max_iterations(), 7);

        agent.process_user_request("hi").await.unwrap();
        let request = &provider.requests()[0];
        assert_eq!(request.model, "test-model");
        assert_eq!(request.messages[0].content, "Configured prompt");
    }

    #[test]
    fn preview_truncates_long_payloads() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(PREVIEW_CHARS + 10);
        let cut = preview(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
    }
}
