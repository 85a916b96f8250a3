//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig` (+ `MemoryConfig`, `StreamingConfig`),
//! `ProvidersConfig` → `ProviderConfig`, `RelayConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AgentError, Result};
use crate::types::Backend;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.aigent/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub providers: ProvidersConfig,
    pub relay: RelayConfig,
}

impl Config {
    /// Provider settings for the configured agent backend.
    pub fn active_provider(&self) -> &ProviderConfig {
        self.providers.get(self.agent.backend)
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Immutable settings captured when an agent is constructed.
///
/// `backend` is the one field without a default: a config that names no
/// backend, or an unknown one, fails to deserialize. Legacy payloads spell
/// it `provider`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Display name.
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Seeds the first message of every conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Which backend answers for this agent.
    #[serde(alias = "provider")]
    pub backend: Backend,
    /// Model identifier forwarded to the backend.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature (0.0 – 2.0).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens to generate per response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
}

fn default_agent_name() -> String {
    "Aigent".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            description: None,
            system_prompt: default_system_prompt(),
            backend: Backend::OpenAi,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            memory: MemoryConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Create a config with defaults for everything but the essentials.
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        backend: Backend,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            backend,
            model: model.into(),
            ..Default::default()
        }
    }

    /// Check the invariants an agent relies on.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.memory.enabled && self.memory.max_messages == 0 {
            return Err(AgentError::config(
                "memory.maxMessages must be at least 1 when memory is enabled",
            ));
        }
        if self.max_tokens == Some(0) {
            return Err(AgentError::config("maxTokens must be positive"));
        }
        if self.streaming.chunk_size == 0 {
            return Err(AgentError::config("streaming.chunkSize must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(AgentError::config("model must not be empty"));
        }
        Ok(())
    }
}

/// Retention policy for the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    pub enabled: bool,
    /// Upper bound on retained messages, system message included.
    pub max_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: 10,
        }
    }
}

/// Display-only chunking of a finished response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingConfig {
    pub enabled: bool,
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Pause between chunks, in milliseconds.
    pub delay_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_size: 50,
            delay_ms: 50,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Connection settings for a single backend (API key, base URL, headers).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Custom API base URL (overrides the backend default).
    #[serde(alias = "baseURL", alias = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Config with only an API key set.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// One `ProviderConfig` per backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub claude: ProviderConfig,
    pub llama: ProviderConfig,
    pub custom: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, backend: Backend) -> &ProviderConfig {
        match backend {
            Backend::OpenAi => &self.openai,
            Backend::Claude => &self.claude,
            Backend::Llama => &self.llama,
            Backend::Custom => &self.custom,
        }
    }

    pub fn get_mut(&mut self, backend: Backend) -> &mut ProviderConfig {
        match backend {
            Backend::OpenAi => &mut self.openai,
            Backend::Claude => &mut self.claude,
            Backend::Llama => &mut self.llama,
            Backend::Custom => &mut self.custom,
        }
    }
}

// ─────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────

/// WebSocket relay settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
