//! Tool registry — name-keyed store of caller-invoked tools.
//!
//! Unlike function resolution, tool failures are not absorbed: they reach
//! the caller as `AgentError::Tool`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use aigent_core::{AgentError, Result};

use super::base::Tool;

/// Tools keyed by their registered name. Iteration order is by name.
#[derive(Default)]
pub struct ToolRegistry {
    by_name: BTreeMap<String, Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_name.keys()).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last registration under a name wins.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.by_name.insert(name.clone(), tool).is_some() {
            info!(tool = %name, "replaced tool");
        } else {
            info!(tool = %name, "registered tool");
        }
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let removed = self.by_name.remove(name);
        if removed.is_some() {
            info!(tool = name, "unregistered tool");
        }
        removed
    }

    /// Registered names in sorted order.
    pub fn tool_names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Run the named tool with `params`.
    ///
    /// # Errors
    /// `Configuration` if no tool has that name, `Tool` if the tool fails.
    pub async fn execute(&self, name: &str, params: HashMap<String, Value>) -> Result<Value> {
        let Some(tool) = self.by_name.get(name) else {
            warn!(tool = name, "unknown tool requested");
            return Err(AgentError::config(format!("Tool '{name}' not found")));
        };

        debug!(tool = name, args = params.len(), "executing tool");
        match tool.execute(params).await {
            Ok(value) => Ok(value),
            Err(source) => {
                warn!(tool = name, error = %source, "tool failed");
                Err(AgentError::Tool {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
