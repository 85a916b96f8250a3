//! LLM provider trait — the single capability every backend exposes.

use async_trait::async_trait;
use aigent_core::{Backend, ProviderRequest, ProviderResponse, Result};

/// Trait that all LLM backends implement.
///
/// Implementations own their wire format: role mapping, request body shape,
/// and response normalization all happen behind `generate_response`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion.
    ///
    /// # Errors
    /// `AgentError::Provider` on transport failure, a non-success status,
    /// a malformed payload, or a response with no usable content.
    async fn generate_response(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Which backend this is.
    fn backend(&self) -> Backend;

    /// Display name for logging.
    fn display_name(&self) -> &str {
        self.backend().display_name()
    }
}
