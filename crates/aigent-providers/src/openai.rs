//! OpenAI backend — `/chat/completions` with legacy function calling.
//!
//! Messages are forwarded verbatim: OpenAI understands all four roles,
//! including `function` results tagged with `name`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aigent_core::config::ProviderConfig;
use aigent_core::{
    AgentError, Backend, FunctionCallIntent, FunctionDescriptor, Message, ProviderRequest,
    ProviderResponse, Result, Usage,
};

use crate::http::{header, resolve_api_base, HttpClient};
use crate::traits::LlmProvider;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI chat completions client.
#[derive(Debug)]
pub struct OpenAiProvider {
    http: HttpClient,
    api_base: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Create the provider, failing fast if no API key is configured.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AgentError::config("API key is required for OpenAI provider"));
        }
        Ok(Self {
            http: HttpClient::new(config, Backend::OpenAi)?,
            api_base: resolve_api_base(config, DEFAULT_API_BASE),
            api_key: config.api_key.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

// ─────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionDescriptor]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments string.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl ChatCompletionResponse {
    fn into_response(self) -> Result<ProviderResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::provider(Backend::OpenAi, "No response received from OpenAI"))?;

        let function_call = match choice.message.function_call {
            Some(call) => {
                let arguments = serde_json::from_str(&call.arguments).map_err(|e| {
                    AgentError::provider(
                        Backend::OpenAi,
                        format!("invalid function_call arguments for '{}': {e}", call.name),
                    )
                })?;
                Some(FunctionCallIntent::new(call.name, arguments))
            }
            None => None,
        };

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            function_call,
            usage: self.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_response(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        debug!(
            backend = %Backend::OpenAi,
            model = %request.model,
            messages = request.messages.len(),
            functions = request.functions.as_ref().map_or(0, |f| f.len()),
            "Calling LLM"
        );

        let functions = request.functions.as_deref();
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            functions,
            function_call: functions.map(|_| "auto"),
        };

        let auth = format!("Bearer {}", self.api_key);
        let raw: ChatCompletionResponse = self
            .http
            .post_json(&self.completions_url(), header("authorization", &auth), &body)
            .await?;

        let response = raw.into_response()?;
        debug!(
            backend = %Backend::OpenAi,
            content_len = response.content.len(),
            function_call = response.function_call.as_ref().map_or("-", |c| c.name.as_str()),
            "LLM response received"
        );
        Ok(response)
    }

    fn backend(&self) -> Backend {
        Backend::OpenAi
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
