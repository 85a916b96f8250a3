//! Model-invoked functions — registry plus the resolver that turns a
//! backend's function-call intent into a `function` message.
//!
//! Handler failures never escape: they become `{"error": "..."}` content so
//! the model can see its own failure on the next turn.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use aigent_core::{AgentError, FunctionCallIntent, FunctionDescriptor, Message, Result};

// ─────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────

/// Async callable behind a function definition.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> FunctionHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn call(&self, arguments: Value) -> anyhow::Result<Value> {
        (self)(arguments).await
    }
}

/// A function the model may ask us to run.
#[derive(Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
    pub handler: Arc<dyn FunctionHandler>,
}

impl std::fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl FunctionDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: impl FunctionHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(handler),
        }
    }

    /// The part the backend gets to see.
    pub fn descriptor(&self) -> FunctionDescriptor {
        FunctionDescriptor::new(&self.name, &self.description, self.parameters.clone())
    }
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Functions keyed by name. Registering an existing name replaces it.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDefinition>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register(&mut self, definition: FunctionDefinition) {
        info!(function = %definition.name, "registered function");
        if let Some(old) = self.functions.insert(definition.name.clone(), definition) {
            debug!(function = %old.name, "replaced existing function");
        }
    }

    /// Remove a function. Returns the removed definition, if any.
    pub fn unregister(&mut self, name: &str) -> Option<FunctionDefinition> {
        let removed = self.functions.remove(name);
        if removed.is_some() {
            info!(function = name, "unregistered function");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Descriptors for every registered function, sorted by name.
    /// `None` when nothing is registered, so requests omit the field.
    pub fn descriptors(&self) -> Option<Vec<FunctionDescriptor>> {
        if self.functions.is_empty() {
            return None;
        }
        let mut defs: Vec<FunctionDescriptor> =
            self.functions.values().map(FunctionDefinition::descriptor).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        Some(defs)
    }

    /// Run the function named by `intent` and build the `function` message
    /// carrying its result.
    ///
    /// Unknown names are a configuration error. A failing handler is
    /// absorbed into the message content as `{"error": "..."}`.
    pub async fn resolve(&self, intent: &FunctionCallIntent) -> Result<Message> {
        let definition = self.functions.get(&intent.name).ok_or_else(|| {
            AgentError::config(format!("Function '{}' not found", intent.name))
        })?;

        debug!(function = %intent.name, "invoking function");
        let content = match definition.handler.call(intent.arguments.clone()).await {
            Ok(result) => result.to_string(),
            Err(e) => {
                warn!(function = %intent.name, error = %e, "function handler failed");
                json!({ "error": e.to_string() }).to_string()
            }
        };

        Ok(Message::function(&intent.name, content))
    }
}
