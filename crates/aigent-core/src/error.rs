//! Error taxonomy shared by every Aigent crate.
//!
//! Each variant carries a stable machine-readable code (see [`AgentError::code`])
//! so front ends such as the relay can forward it verbatim.

use thiserror::Error;

use crate::types::Backend;

/// The error type for all Aigent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid or missing setup: backend identifier, credential shape,
    /// agent config, or an unknown function/tool name.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Upstream transport or protocol failure, or an empty response.
    #[error("{backend} provider error: {message}")]
    Provider { backend: Backend, message: String },

    /// A directly invoked tool failed.
    #[error("Tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Relay-level failure (e.g. unknown agent id).
    #[error("Realtime error: {0}")]
    Realtime(String),
}

/// Result type alias using [`AgentError`].
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        AgentError::Configuration(message.into())
    }

    /// Shorthand for a provider error attributed to `backend`.
    pub fn provider(backend: Backend, message: impl Into<String>) -> Self {
        AgentError::Provider {
            backend,
            message: message.into(),
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::Configuration(_) => "CONFIGURATION_ERROR",
            AgentError::Provider { .. } => "LLM_ERROR",
            AgentError::Tool { .. } => "TOOL_ERROR",
            AgentError::Realtime(_) => "REALTIME_ERROR",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, AgentError::Configuration(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, AgentError::Provider { .. })
    }
}
