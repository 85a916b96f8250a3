//! The agent orchestrator — one conversation, one backend.
//!
//! A turn appends the user message, sends the retained history plus every
//! registered function descriptor to the provider, appends the assistant
//! reply, and resolves at most one function call. If the provider fails
//! the history is restored exactly as it was before the turn.
//!
//! An `Agent` is not internally synchronized. Share it behind a mutex if
//! several tasks need it (see [`crate::relay::RelayHub`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use aigent_core::config::{AgentConfig, ProviderConfig};
use aigent_core::{Message, ProviderRequest, ProviderResponse, Result};
use aigent_providers::{create_provider, LlmProvider};

use crate::functions::{FunctionDefinition, FunctionRegistry};
use crate::memory::MessageStore;
use crate::streaming::{emit_chunks, StreamChunk};
use crate::tools::{Tool, ToolRegistry};

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

pub struct Agent {
    config: AgentConfig,
    provider: Arc<dyn LlmProvider>,
    memory: MessageStore,
    functions: FunctionRegistry,
    tools: ToolRegistry,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("backend", &self.provider.backend())
            .field("messages", &self.memory.len())
            .field("functions", &self.functions)
            .field("tools", &self.tools)
            .finish()
    }
}

impl Agent {
    /// Build an agent for `config.backend`, validating both configs before
    /// any network traffic.
    pub fn new(config: AgentConfig, provider_config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let provider = create_provider(config.backend, provider_config)?;
        Self::with_provider(config, provider)
    }

    /// Build an agent around an existing provider (custom backends, tests).
    pub fn with_provider(config: AgentConfig, provider: Arc<dyn LlmProvider>) -> Result<Self> {
        config.validate()?;

        let mut memory = MessageStore::new(config.memory.clone());
        memory.append(Message::system(&config.system_prompt));

        info!(
            agent = %config.name,
            backend = %provider.backend(),
            model = %config.model,
            "Agent created"
        );

        Ok(Self {
            config,
            provider,
            memory,
            functions: FunctionRegistry::new(),
            tools: ToolRegistry::new(),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    // ────────────── Turns ──────────────

    /// Run one turn and return the provider's response.
    ///
    /// # Errors
    /// - `Provider`: the backend call failed; history is left untouched.
    /// - `Configuration`: the model called an unregistered function. The
    ///   user and assistant messages stay in history.
    pub async fn send_message(&mut self, content: impl Into<String>) -> Result<ProviderResponse> {
        let before = self.memory.snapshot();
        self.memory.append(Message::user(content));

        let request = self.build_request();
        debug!(
            agent = %self.config.name,
            messages = request.messages.len(),
            functions = request.functions.as_ref().map_or(0, Vec::len),
            "Sending turn"
        );

        let response = match self.provider.generate_response(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(agent = %self.config.name, error = %e, "Turn failed, rolling back");
                self.memory.restore(before);
                return Err(e);
            }
        };

        let assistant = match response.function_call {
            Some(ref intent) => {
                Message::assistant_function_call(&response.content, intent.to_function_call())
            }
            None => Message::assistant(&response.content),
        };
        self.memory.append(assistant);

        if let Some(ref intent) = response.function_call {
            let result = self.functions.resolve(intent).await?;
            self.memory.append(result);
        }

        if let Some(ref usage) = response.usage {
            debug!(
                agent = %self.config.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Turn complete"
            );
        }

        Ok(response)
    }

    /// Run one turn, then replay the reply on `tx` as display chunks sized
    /// by the streaming config. Chunks are only emitted after the whole
    /// response has arrived.
    pub async fn send_message_chunked(
        &mut self,
        content: impl Into<String>,
        tx: &mpsc::Sender<StreamChunk>,
    ) -> Result<ProviderResponse> {
        let response = self.send_message(content).await?;
        let streaming = &self.config.streaming;
        emit_chunks(
            &response,
            streaming.chunk_size,
            Duration::from_millis(streaming.delay_ms),
            tx,
        )
        .await;
        Ok(response)
    }

    fn build_request(&self) -> ProviderRequest {
        ProviderRequest {
            messages: self.memory.snapshot(),
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            functions: self.functions.descriptors(),
        }
    }

    // ────────────── Memory ──────────────

    /// Append a message directly, subject to retention.
    pub fn add_message(&mut self, message: Message) {
        self.memory.append(message);
    }

    /// Forget everything except the system prompt.
    pub fn clear_memory(&mut self) {
        self.memory.clear();
        debug!(agent = %self.config.name, "Memory cleared");
    }

    /// A detached copy of the history.
    pub fn get_memory(&self) -> Vec<Message> {
        self.memory.snapshot()
    }

    // ────────────── Functions & tools ──────────────

    pub fn register_function(&mut self, definition: FunctionDefinition) {
        self.functions.register(definition);
    }

    /// Returns whether a function was removed.
    pub fn unregister_function(&mut self, name: &str) -> bool {
        self.functions.unregister(name).is_some()
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    /// Returns whether a tool was removed.
    pub fn unregister_tool(&mut self, name: &str) -> bool {
        self.tools.unregister(name).is_some()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.tool_names()
    }

    /// Run a registered tool. Has no effect on the conversation.
    pub async fn execute_tool(&self, name: &str, params: HashMap<String, Value>) -> Result<Value> {
        self.tools.execute(name, params).await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    use aigent_core::config::{MemoryConfig, StreamingConfig};
    use aigent_core::{AgentError, Backend, FunctionCallIntent, Role, Usage};

    use crate::tools::CalculatorTool;

    /// A provider that replays scripted results and records every request.
    struct MockProvider {
        script: Mutex<Vec<Result<ProviderResponse>>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl MockProvider {
        fn new(script: Vec<Result<ProviderResponse>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn replies(texts: &[&str]) -> Arc<Self> {
            Self::new(texts.iter().map(|t| Ok(ProviderResponse::text(*t))).collect())
        }

        fn requests(&self) -> Vec<ProviderRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn generate_response(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(ProviderResponse::text("(no more responses)"))
            } else {
                script.remove(0)
            }
        }

        fn backend(&self) -> Backend {
            Backend::Custom
        }
    }

    fn failure() -> Result<ProviderResponse> {
        Err(AgentError::provider(Backend::Custom, "upstream exploded"))
    }

    fn config(max_messages: usize) -> AgentConfig {
        let mut config = AgentConfig::new("test", "S", Backend::Custom, "mock-model");
        config.memory = MemoryConfig {
            enabled: true,
            max_messages,
        };
        config
    }

    fn agent(max_messages: usize, provider: Arc<MockProvider>) -> Agent {
        Agent::with_provider(config(max_messages), provider).unwrap()
    }

    fn roles_and_content(agent: &Agent) -> Vec<(Role, String)> {
        agent
            .get_memory()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect()
    }

    fn weather_function() -> FunctionDefinition {
        FunctionDefinition::new(
            "get_weather",
            "Weather for a city",
            json!({ "type": "object", "properties": { "city": { "type": "string" } } }),
            |args: Value| async move {
                Ok::<_, anyhow::Error>(json!({ "city": args["city"], "temp": 21 }))
            },
        )
    }

    #[test]
    fn test_construction_seeds_system_prompt() {
        let a = agent(10, MockProvider::replies(&[]));
        assert_eq!(roles_and_content(&a), vec![(Role::System, "S".to_string())]);
    }

    #[test]
    fn test_construction_rejects_invalid_config() {
        let mut bad = config(10);
        bad.temperature = 3.5;
        assert!(Agent::with_provider(bad, MockProvider::replies(&[])).is_err());
    }

    #[test]
    fn test_new_fails_before_network() {
        // No server anywhere: these must fail during validation.
        let mut cfg = config(10);
        cfg.backend = Backend::OpenAi;
        let err = Agent::new(cfg, &ProviderConfig::with_key("not-a-key")).unwrap_err();
        assert!(err.is_configuration());

        let err = Agent::new(config(10), &ProviderConfig::default()).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_unknown_backend_identifier_rejected() {
        let err = "gemini".parse::<Backend>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_single_turn() {
        let provider = MockProvider::replies(&["hi"]);
        let mut a = agent(3, provider.clone());

        let response = a.send_message("hello").await.unwrap();
        assert_eq!(response.content, "hi");
        assert_eq!(
            roles_and_content(&a),
            vec![
                (Role::System, "S".to_string()),
                (Role::User, "hello".to_string()),
                (Role::Assistant, "hi".to_string()),
            ]
        );

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].model, "mock-model");
        assert_eq!(sent[0].messages.len(), 2);
        assert!(sent[0].functions.is_none());
    }

    #[tokio::test]
    async fn test_retention_with_two_messages() {
        let mut a = agent(2, MockProvider::replies(&["hi", "again"]));

        a.send_message("hello").await.unwrap();
        assert_eq!(
            roles_and_content(&a),
            vec![(Role::System, "S".to_string()), (Role::Assistant, "hi".to_string())]
        );

        a.send_message("more").await.unwrap();
        assert_eq!(a.get_memory().len(), 2);
        assert_eq!(a.get_memory()[1].content, "again");
    }

    #[tokio::test]
    async fn test_history_bounded_across_many_turns() {
        let mut a = agent(5, MockProvider::replies(&[]));
        for i in 0..12 {
            a.send_message(format!("turn {i}")).await.unwrap();
            let memory = a.get_memory();
            assert!(memory.len() <= 5);
            assert!(memory[0].is_system());
        }
    }

    #[tokio::test]
    async fn test_provider_failure_rolls_back() {
        let mut a = agent(10, MockProvider::new(vec![Ok(ProviderResponse::text("one")), failure()]));
        a.send_message("first").await.unwrap();
        let before = a.get_memory();

        let err = a.send_message("second").await.unwrap_err();
        assert_eq!(err.code(), "LLM_ERROR");
        assert_eq!(a.get_memory(), before);
    }

    #[tokio::test]
    async fn test_rollback_restores_trimmed_history() {
        // With max=3 the user append trims the oldest message before the call.
        let mut a = agent(3, MockProvider::new(vec![Ok(ProviderResponse::text("a1")), failure()]));
        a.send_message("u1").await.unwrap();
        let before = a.get_memory();
        assert_eq!(before.len(), 3);

        assert!(a.send_message("u2").await.is_err());
        assert_eq!(a.get_memory(), before);
    }

    #[tokio::test]
    async fn test_agent_usable_after_failure() {
        let mut a = agent(10, MockProvider::new(vec![failure(), Ok(ProviderResponse::text("ok"))]));
        assert!(a.send_message("x").await.is_err());
        let response = a.send_message("y").await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(a.get_memory().len(), 3);
    }

    #[tokio::test]
    async fn test_function_call_resolved() {
        let provider = MockProvider::new(vec![Ok(ProviderResponse {
            content: String::new(),
            function_call: Some(FunctionCallIntent::new("get_weather", json!({ "city": "Porto" }))),
            usage: Some(Usage::new(5, 1)),
        })]);
        let mut a = agent(10, provider.clone());
        a.register_function(weather_function());

        let response = a.send_message("weather?").await.unwrap();
        assert!(response.has_function_call());

        let memory = a.get_memory();
        assert_eq!(memory.len(), 4);
        let call = memory[2].function_call.as_ref().unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(memory[3].role, Role::Function);
        assert_eq!(memory[3].name.as_deref(), Some("get_weather"));
        let result: Value = serde_json::from_str(&memory[3].content).unwrap();
        assert_eq!(result["city"], "Porto");

        let functions = provider.requests()[0].functions.clone().unwrap();
        assert_eq!(functions[0].name, "get_weather");
    }

    #[tokio::test]
    async fn test_function_failure_absorbed() {
        let provider = MockProvider::new(vec![Ok(ProviderResponse {
            content: "calling".into(),
            function_call: Some(FunctionCallIntent::new("flaky", json!({}))),
            usage: None,
        })]);
        let mut a = agent(10, provider);
        a.register_function(FunctionDefinition::new(
            "flaky",
            "Always fails",
            json!({}),
            |_args: Value| async move { Err::<Value, _>(anyhow::anyhow!("quota exceeded")) },
        ));

        let response = a.send_message("go").await.unwrap();
        assert_eq!(response.content, "calling");

        let memory = a.get_memory();
        let function_messages: Vec<&Message> =
            memory.iter().filter(|m| m.role == Role::Function).collect();
        assert_eq!(function_messages.len(), 1);
        let parsed: Value = serde_json::from_str(&function_messages[0].content).unwrap();
        assert_eq!(parsed["error"], "quota exceeded");
    }

    #[tokio::test]
    async fn test_unknown_function_is_configuration_error_without_rollback() {
        let provider = MockProvider::new(vec![Ok(ProviderResponse {
            content: String::new(),
            function_call: Some(FunctionCallIntent::new("ghost", json!({}))),
            usage: None,
        })]);
        let mut a = agent(10, provider);

        let err = a.send_message("hello").await.unwrap_err();
        assert!(err.is_configuration());
        let roles: Vec<Role> = a.get_memory().into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_unregister_function_removes_descriptor() {
        let provider = MockProvider::replies(&["a"]);
        let mut a = agent(10, provider.clone());
        a.register_function(weather_function());
        assert!(a.unregister_function("get_weather"));
        assert!(!a.unregister_function("get_weather"));

        a.send_message("x").await.unwrap();
        assert!(provider.requests()[0].functions.is_none());
    }

    #[tokio::test]
    async fn test_clear_memory_idempotent() {
        let mut a = agent(10, MockProvider::replies(&["a", "b"]));
        a.send_message("1").await.unwrap();
        a.send_message("2").await.unwrap();

        a.clear_memory();
        let once = a.get_memory();
        a.clear_memory();
        assert_eq!(a.get_memory(), once);
        assert_eq!(once, vec![Message::system("S")]);
    }

    #[test]
    fn test_add_message_and_memory_snapshot_detached() {
        let mut a = agent(10, MockProvider::replies(&[]));
        let mut snapshot = a.get_memory();
        snapshot.push(Message::user("sneaky"));
        assert_eq!(a.get_memory().len(), 1);

        a.add_message(Message::assistant("manual"));
        assert_eq!(a.get_memory().len(), 2);
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let mut a = agent(10, MockProvider::replies(&[]));
        a.register_tool(Arc::new(CalculatorTool));

        let mut params = HashMap::new();
        params.insert("expression".to_string(), json!("1 + 2"));
        let out = a.execute_tool("calculator", params).await.unwrap();
        assert_eq!(out["result"], 3.0);
        // Tools never touch the conversation
        assert_eq!(a.get_memory().len(), 1);

        let err = a.execute_tool("nope", HashMap::new()).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("nope"));

        assert!(a.unregister_tool("calculator"));
        assert!(a.tool_names().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_chunked() {
        let mut cfg = config(10);
        cfg.streaming = StreamingConfig {
            enabled: true,
            chunk_size: 4,
            delay_ms: 0,
        };
        let provider = MockProvider::new(vec![Ok(ProviderResponse {
            content: "chunked reply".into(),
            function_call: None,
            usage: Some(Usage::new(4, 3)),
        })]);
        let mut a = Agent::with_provider(cfg, provider).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let response = a.send_message_chunked("go", &tx).await.unwrap();
        drop(tx);

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(chunks.len(), 4);
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, response.content);
        assert!(chunks.last().unwrap().is_complete);
        assert_eq!(chunks.last().unwrap().usage, Some(Usage::new(4, 3)));

        // The user message is recorded once
        let users = a.get_memory().iter().filter(|m| m.role == Role::User).count();
        assert_eq!(users, 1);
    }
}
