//! Shared CLI helpers — response printing, banner, path display.

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde_json::Value;

use aigent_agent::StreamChunk;
use aigent_core::{Message, Role};

/// Print an agent response to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "◆ Aigent".cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Print the speaker line that precedes a chunked response.
pub fn print_stream_header() {
    println!();
    println!("{}", "◆ Aigent".cyan().bold());
}

/// Print one display chunk without a trailing newline; the final chunk
/// closes the line and reports usage when the backend gave it.
pub fn print_chunk(chunk: &StreamChunk) {
    print!("{}", chunk.content);
    let _ = std::io::stdout().flush();
    if chunk.is_complete {
        println!();
        if let Some(usage) = &chunk.usage {
            println!(
                "{}",
                format!(
                    "tokens: {} prompt + {} completion = {}",
                    usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                )
                .dimmed()
            );
        }
        println!();
    }
}

/// Print conversation history, one line per message.
pub fn print_history(messages: &[Message]) {
    println!();
    if messages.is_empty() {
        println!("{}", "(empty)".dimmed());
    }
    for message in messages {
        let label = format!("{:<9}", message.role.as_str());
        let label = match message.role {
            Role::System => label.dimmed(),
            Role::User => label.green(),
            Role::Assistant => label.cyan(),
            Role::Function => label.yellow(),
        };
        let body = match (&message.name, &message.function_call) {
            (_, Some(call)) => format!("→ {}({})", call.name, call.arguments),
            (Some(name), None) => format!("{name}: {}", message.content),
            (None, None) => message.content.clone(),
        };
        println!("  {label} {}", aigent_core::utils::truncate_string(&body, 120));
    }
    println!();
}

/// Print the banner shown at REPL start.
pub fn print_banner(agent_name: &str, model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "◆ Aigent".cyan().bold(), version.dimmed());
    println!("{}", format!("{agent_name} · {model}").dimmed());
    println!(
        "{}",
        "Type a message, /memory, /clear, /tools, /tool <name> <json>, or \"exit\" to quit."
            .dimmed()
    );
    println!();
}

/// List the registered tool names.
pub fn print_tool_names(names: &[String]) {
    println!();
    if names.is_empty() {
        println!("{}", "(no tools registered)".dimmed());
    }
    for name in names {
        println!("  {}", name.cyan());
    }
    println!();
}

/// Print a tool's JSON output, pretty-printed.
pub fn print_tool_output(name: &str, output: &Value) {
    let body = serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string());
    println!();
    println!("{} {}", "◆".cyan(), name.bold());
    println!("{body}");
    println!();
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "… thinking".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// Render a path with the home directory shortened to `~`.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs_next::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return if rest.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~/{}", rest.display())
            };
        }
    }
    path.display().to_string()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
