//! Llama backend — Ollama `/api/chat`, non-streaming.
//!
//! Local instances usually need no key; when one is configured it is sent
//! as a bearer token (hosted Ollama-compatible gateways).

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aigent_core::config::ProviderConfig;
use aigent_core::{AgentError, Backend, Message, ProviderRequest, ProviderResponse, Result, Role, Usage};

use crate::http::{header, resolve_api_base, HttpClient};
use crate::traits::LlmProvider;

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_NUM_PREDICT: u32 = 1000;

/// Ollama chat client.
#[derive(Debug)]
pub struct LlamaProvider {
    http: HttpClient,
    api_base: String,
    api_key: Option<String>,
}

impl LlamaProvider {
    /// Create the provider. Needs an explicit `apiBase` or an API key.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let has_base = config
            .api_base
            .as_deref()
            .is_some_and(|base| !base.trim().is_empty());
        if !has_base && config.api_key.is_empty() {
            return Err(AgentError::config(
                "Either apiBase or apiKey is required for LLaMA provider",
            ));
        }
        Ok(Self {
            http: HttpClient::new(config, Backend::Llama)?,
            api_base: resolve_api_base(config, DEFAULT_API_BASE),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.api_base)
    }

    fn format_messages(messages: &[Message]) -> Vec<OllamaMessage<'_>> {
        messages
            .iter()
            .map(|msg| OllamaMessage {
                role: match msg.role {
                    Role::Function => "tool",
                    other => other.as_str(),
                },
                content: &msg.content,
            })
            .collect()
    }

    fn auth_headers(&self) -> HeaderMap {
        match self.api_key {
            Some(ref key) => header("authorization", &format!("Bearer {key}")),
            None => HeaderMap::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    options: ChatOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_response(self) -> Result<ProviderResponse> {
        let content = self
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| AgentError::provider(Backend::Llama, "No response received from LLaMA"))?;

        let usage = match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(Usage::new(
                prompt.unwrap_or(0),
                completion.unwrap_or(0),
            )),
        };

        Ok(ProviderResponse {
            content,
            function_call: None,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for LlamaProvider {
    async fn generate_response(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        debug!(
            backend = %Backend::Llama,
            model = %request.model,
            messages = request.messages.len(),
            "Calling LLM"
        );

        let body = ChatRequest {
            model: &request.model,
            messages: Self::format_messages(&request.messages),
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens.unwrap_or(DEFAULT_NUM_PREDICT),
            },
            stream: false,
        };

        let raw: ChatResponse = self
            .http
            .post_json(&self.chat_url(), self.auth_headers(), &body)
            .await?;

        raw.into_response()
    }

    fn backend(&self) -> Backend {
        Backend::Llama
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
