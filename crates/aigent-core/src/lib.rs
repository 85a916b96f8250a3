//! Aigent core — shared types, error taxonomy, configuration, and helpers.
//!
//! Everything here is backend-agnostic: the provider crate maps these types
//! onto each vendor's wire format, and the agent crate drives them through
//! a conversation.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::{AgentError, Result};
pub use types::{
    Backend, FunctionCall, FunctionCallIntent, FunctionDescriptor, Message, ProviderRequest,
    ProviderResponse, Role, Usage,
};
