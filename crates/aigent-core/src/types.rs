//! Core types for Aigent — the backend-agnostic conversation model.
//!
//! Providers translate these into their own wire formats; the agent crate
//! stores and replays them. Nothing in here performs I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;

// ─────────────────────────────────────────────
// Backend identifier
// ─────────────────────────────────────────────

/// The closed set of LLM backends an agent can be wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    OpenAi,
    Claude,
    Llama,
    /// Caller-supplied implementation, injected rather than built by the factory.
    Custom,
}

impl Backend {
    /// All backends, in display order.
    pub const ALL: [Backend; 4] = [
        Backend::OpenAi,
        Backend::Claude,
        Backend::Llama,
        Backend::Custom,
    ];

    /// The identifier used in config files and relay requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Claude => "claude",
            Backend::Llama => "llama",
            Backend::Custom => "custom",
        }
    }

    /// Human-readable name for logs and status output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::OpenAi => "OpenAI",
            Backend::Claude => "Claude",
            Backend::Llama => "LLaMA",
            Backend::Custom => "Custom",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Backend::OpenAi),
            "claude" => Ok(Backend::Claude),
            "llama" => Ok(Backend::Llama),
            "custom" => Ok(Backend::Custom),
            other => Err(AgentError::config(format!("Unsupported backend: {other}"))),
        }
    }
}

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the conversation history.
///
/// Order matters: the full retained sequence is replayed to the backend on
/// every turn. Messages are never mutated once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Function name; always set on `function`-role messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function call announced by an assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
            name: None,
            function_call: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message that also announces a function call.
    pub fn assistant_function_call(content: impl Into<String>, call: FunctionCall) -> Self {
        Message {
            function_call: Some(call),
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a function result message tagged with the function name.
    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Message {
            name: Some(name.into()),
            ..Self::new(Role::Function, content)
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// A function call as stored in history: arguments stay JSON-encoded text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

// ─────────────────────────────────────────────
// Function descriptors (sent to the backend)
// ─────────────────────────────────────────────

/// The model-facing half of a registered function: no handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        FunctionDescriptor {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

// ─────────────────────────────────────────────
// Provider request / response
// ─────────────────────────────────────────────

/// Everything a backend needs for one completion.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    /// `None` when no functions are registered.
    pub functions: Option<Vec<FunctionDescriptor>>,
}

/// Normalized backend response. Lives for one turn only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// A plain text response with no function call or usage.
    pub fn text(content: impl Into<String>) -> Self {
        ProviderResponse {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn has_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}

/// A backend's request to invoke a local function, arguments already parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallIntent {
    pub name: String,
    pub arguments: Value,
}

impl FunctionCallIntent {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        FunctionCallIntent {
            name: name.into(),
            arguments,
        }
    }

    /// The history form of this intent (arguments re-encoded as JSON text).
    pub fn to_function_call(&self) -> FunctionCall {
        FunctionCall {
            name: self.name.clone(),
            arguments: self.arguments.to_string(),
        }
    }
}

/// Token accounting reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Counts come straight off the wire; the total saturates at `u32::MAX`.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
