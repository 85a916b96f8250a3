//! LLM provider layer for Aigent.
//!
//! One HTTP client per backend, all behind a single async capability.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait that all providers implement
//! - [`openai`], [`claude`], [`llama`] — the built-in backends
//! - [`factory::create_provider`] — validate a config and build the right backend
//! - [`http`] — shared JSON-over-HTTP plumbing

pub mod claude;
pub mod factory;
pub mod http;
pub mod llama;
pub mod openai;
pub mod traits;

pub use claude::ClaudeProvider;
pub use factory::{create_provider, validate_provider_config};
pub use llama::LlamaProvider;
pub use openai::OpenAiProvider;
pub use traits::LlmProvider;
