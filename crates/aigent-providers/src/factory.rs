//! Backend selection — validate a provider config and build the matching client.

use std::sync::Arc;

use tracing::info;

use aigent_core::config::ProviderConfig;
use aigent_core::{AgentError, Backend, Result};

use crate::claude::ClaudeProvider;
use crate::llama::LlamaProvider;
use crate::openai::OpenAiProvider;
use crate::traits::LlmProvider;

/// Check that `config` is usable for `backend` without building anything.
///
/// - OpenAI: key required, must start with `sk-`
/// - Claude: key required, must start with `sk-ant-`
/// - Llama: `apiBase` or `apiKey` required
/// - Custom: anything goes
pub fn validate_provider_config(backend: Backend, config: &ProviderConfig) -> Result<()> {
    match backend {
        Backend::OpenAi => {
            if config.api_key.is_empty() {
                return Err(AgentError::config("API key is required for OpenAI provider"));
            }
            if !config.api_key.starts_with("sk-") {
                return Err(AgentError::config("Invalid OpenAI API key format"));
            }
        }
        Backend::Claude => {
            if config.api_key.is_empty() {
                return Err(AgentError::config("API key is required for Claude provider"));
            }
            if !config.api_key.starts_with("sk-ant-") {
                return Err(AgentError::config("Invalid Claude API key format"));
            }
        }
        Backend::Llama => {
            let has_base = config
                .api_base
                .as_deref()
                .is_some_and(|base| !base.trim().is_empty());
            if !has_base && config.api_key.is_empty() {
                return Err(AgentError::config(
                    "Either apiBase or apiKey is required for LLaMA provider",
                ));
            }
        }
        Backend::Custom => {}
    }
    Ok(())
}

/// Validate `config` and construct the provider for `backend`.
///
/// `Custom` has no built-in client; implement [`LlmProvider`] yourself and
/// hand it to the agent directly.
pub fn create_provider(backend: Backend, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    validate_provider_config(backend, config)?;

    let provider: Arc<dyn LlmProvider> = match backend {
        Backend::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        Backend::Claude => Arc::new(ClaudeProvider::new(config)?),
        Backend::Llama => Arc::new(LlamaProvider::new(config)?),
        Backend::Custom => {
            return Err(AgentError::config(
                "Custom backend has no built-in client; supply an LlmProvider implementation",
            ))
        }
    };

    info!(backend = %backend, "Provider created");
    Ok(provider)
}
