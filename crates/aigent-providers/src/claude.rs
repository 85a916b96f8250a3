//! Claude backend — Anthropic Messages API.
//!
//! Role mapping is lossy:
//! - `system` messages are lifted into the top-level `system` field
//!   (joined with blank lines when there are several);
//! - `assistant` stays `assistant`;
//! - `user` **and `function`** become `user`. Function results therefore
//!   reach Claude as plain user text and lose their function-call structure.
//!
//! Function descriptors are not forwarded, so this backend never returns a
//! function-call intent.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aigent_core::config::ProviderConfig;
use aigent_core::{
    AgentError, Backend, Message, ProviderRequest, ProviderResponse, Result, Role, Usage,
};

use crate::http::{header, resolve_api_base, HttpClient};
use crate::traits::LlmProvider;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Anthropic Messages API client.
#[derive(Debug)]
pub struct ClaudeProvider {
    http: HttpClient,
    api_base: String,
    api_key: String,
}

impl ClaudeProvider {
    /// Create the provider, failing fast if no API key is configured.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AgentError::config("API key is required for Claude provider"));
        }
        Ok(Self {
            http: HttpClient::new(config, Backend::Claude)?,
            api_base: resolve_api_base(config, DEFAULT_API_BASE),
            api_key: config.api_key.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }

    /// Split history into the `system` field and the role-mapped turns.
    fn format_messages(messages: &[Message]) -> (Option<String>, Vec<ClaudeMessage<'_>>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut turns = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::Assistant => turns.push(ClaudeMessage {
                    role: "assistant",
                    content: &msg.content,
                }),
                Role::User | Role::Function => turns.push(ClaudeMessage {
                    role: "user",
                    content: &msg.content,
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, turns)
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = header("x-api-key", &self.api_key);
        headers.extend(header("anthropic-version", ANTHROPIC_VERSION));
        headers
    }
}

// ─────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<ClaudeMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    fn into_response(self) -> Result<ProviderResponse> {
        let text = self
            .content
            .into_iter()
            .next()
            .filter(|block| block.block_type == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| {
                AgentError::provider(Backend::Claude, "No text response received from Claude")
            })?;

        Ok(ProviderResponse {
            content: text,
            function_call: None,
            usage: self
                .usage
                .map(|u| Usage::new(u.input_tokens, u.output_tokens)),
        })
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn generate_response(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let (system, messages) = Self::format_messages(&request.messages);

        debug!(
            backend = %Backend::Claude,
            model = %request.model,
            messages = messages.len(),
            has_system = system.is_some(),
            "Calling LLM"
        );

        let body = MessagesRequest {
            model: &request.model,
            messages,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            system,
        };

        let raw: MessagesResponse = self
            .http
            .post_json(&self.messages_url(), self.auth_headers(), &body)
            .await?;

        raw.into_response()
    }

    fn backend(&self) -> Backend {
        Backend::Claude
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> ClaudeProvider {
        let config = ProviderConfig {
            api_key: "sk-ant-test".into(),
            api_base: Some(server.uri()),
            ..Default::default()
        };
        ClaudeProvider::new(&config).unwrap()
    }

    fn request(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            messages,
            model: "claude-3-5-sonnet-latest".into(),
            temperature: 0.5,
            max_tokens: None,
            functions: None,
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(ClaudeProvider::new(&ProviderConfig::default())
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_format_messages_role_mapping() {
        let history = vec![
            Message::system("Be terse."),
            Message::user("What is 2+2?"),
            Message::assistant("Let me check."),
            Message::function("calc", "4"),
        ];
        let (system, turns) = ClaudeProvider::format_messages(&history);

        assert_eq!(system.as_deref(), Some("Be terse."));
        let roles: Vec<&str> = turns.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(turns[2].content, "4");
    }

    #[test]
    fn test_format_messages_without_system() {
        let history = vec![Message::user("hi")];
        let (system, turns) = ClaudeProvider::format_messages(&history);
        assert!(system.is_none());
        assert_eq!(turns.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 1000,
                "system": "Be terse.",
                "messages": [{ "role": "user", "content": "Hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "text", "text": "Hi." }],
                "usage": { "input_tokens": 12, "output_tokens": 3 }
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let resp = provider
            .generate_response(&request(vec![
                Message::system("Be terse."),
                Message::user("Hello"),
            ]))
            .await
            .unwrap();

        assert_eq!(resp.content, "Hi.");
        assert!(resp.function_call.is_none());
        assert_eq!(resp.usage, Some(Usage::new(12, 3)));
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_non_text_block_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "tool_use", "id": "t1", "name": "x", "input": {} }]
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let err = provider
            .generate_response(&request(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.is_provider());
        assert!(err.to_string().contains("No text response received from Claude"));
    }

    #[tokio::test]
    async fn test_huge_usage_counts_do_not_overflow() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "ok" }],
                "usage": { "input_tokens": 4294967295u32, "output_tokens": 1 }
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let resp = provider
            .generate_response(&request(vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(resp.usage.unwrap().total_tokens, u32::MAX);
    }

    #[tokio::test]
    async fn test_empty_content_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let err = provider
            .generate_response(&request(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.is_provider());
    }

    #[tokio::test]
    async fn test_overloaded_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": { "type": "overloaded_error", "message": "Overloaded" }
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let err = provider
            .generate_response(&request(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }
}
