//! Aigent Agent — the conversation orchestrator and everything it drives.
//!
//! This crate contains:
//! - **agent**: the `Agent` turn loop with rollback on provider failure
//! - **memory**: bounded message history
//! - **functions**: model-invoked functions and their resolution
//! - **tools**: caller-invoked tools plus the built-in set
//! - **streaming**: display chunking of finished responses
//! - **relay**: a multi-agent hub for remote clients

pub mod agent;
pub mod functions;
pub mod memory;
pub mod relay;
pub mod streaming;
pub mod tools;

pub use agent::Agent;
pub use functions::{FunctionDefinition, FunctionHandler, FunctionRegistry};
pub use memory::MessageStore;
pub use relay::{ErrorKind, RelayEvent, RelayHub, RelayRequest, RelaySession};
pub use streaming::{chunk_text, StreamChunk};
pub use tools::{default_tools, Tool, ToolRegistry};
