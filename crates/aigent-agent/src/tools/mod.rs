//! Caller-invoked tools and the built-in set.

pub mod base;
pub mod calculator;
pub mod datetime;
pub mod filesystem;
pub mod http;
pub mod registry;

use std::sync::Arc;

pub use base::{optional_string, params_from_value, require_string, Tool};
pub use calculator::CalculatorTool;
pub use datetime::DateTimeTool;
pub use filesystem::FileSystemTool;
pub use http::{HttpRequestTool, WeatherTool};
pub use registry::ToolRegistry;

/// The built-in tools, ready to hand to `Agent::register_tool`.
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(HttpRequestTool::new()),
        Arc::new(FileSystemTool::default()),
        Arc::new(CalculatorTool),
        Arc::new(DateTimeTool),
        Arc::new(WeatherTool::new()),
    ]
}
