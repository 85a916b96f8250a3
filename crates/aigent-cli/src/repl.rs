//! Interactive REPL over a single `Agent`.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use serde_json::Value;
use tracing::debug;

use aigent_agent::tools::params_from_value;
use aigent_agent::Agent;
use aigent_core::utils::get_history_path;
use aigent_core::AgentError;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// What a line of input asks the REPL to do.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    Clear,
    Memory,
    Tools,
    /// `/tool <name> [json-object]`; `args` is the raw JSON text.
    Tool { name: &'a str, args: &'a str },
    Message(&'a str),
}

/// Run the interactive REPL loop.
pub async fn run(agent: &mut Agent, stream: bool) -> Result<()> {
    helpers::print_banner(&agent.config().name, &agent.config().model);

    let mut editor = create_editor()?;

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let Some(input) = parse_input(&line) else {
            continue;
        };
        let _ = editor.add_history_entry(&line);

        match input {
            Input::Exit => {
                println!("\nGoodbye!");
                break;
            }
            Input::Clear => {
                agent.clear_memory();
                println!("{}\n", "Memory cleared.".dimmed());
            }
            Input::Memory => helpers::print_history(&agent.get_memory()),
            Input::Tools => helpers::print_tool_names(&agent.tool_names()),
            Input::Tool { name: "", .. } => {
                println!("{}\n", "Usage: /tool <name> [json-object]".dimmed());
            }
            Input::Tool { name, args } => match invoke_tool(agent, name, args).await {
                Ok(output) => helpers::print_tool_output(name, &output),
                Err(e) => eprintln!("\n{} [{}] {e:#}\n", "Error:".red().bold(), e.code()),
            },
            Input::Message(text) => {
                debug!(input = text, "processing input");
                if stream {
                    if let Err(e) = crate::send_streamed(agent, text).await {
                        eprintln!("\n{} {e:#}\n", "Error:".red().bold());
                    }
                    continue;
                }

                helpers::print_thinking();
                let result = agent.send_message(text).await;
                helpers::clear_thinking();
                match result {
                    Ok(response) => helpers::print_response(&response.content),
                    Err(e) => eprintln!("\n{} [{}] {e}\n", "Error:".red().bold(), e.code()),
                }
            }
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Classify a raw line; `None` for blank input.
fn parse_input(line: &str) -> Option<Input<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if EXIT_COMMANDS.contains(&lower.as_str()) {
        return Some(Input::Exit);
    }

    let (head, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    if head.eq_ignore_ascii_case("/tool") {
        let rest = rest.trim_start();
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return Some(Input::Tool {
            name,
            args: args.trim(),
        });
    }

    Some(match lower.as_str() {
        "/clear" => Input::Clear,
        "/memory" | "/history" => Input::Memory,
        "/tools" => Input::Tools,
        _ => Input::Message(trimmed),
    })
}

/// Run a registered tool with arguments given as a JSON object.
///
/// Empty `args` means no arguments.
async fn invoke_tool(agent: &Agent, name: &str, args: &str) -> aigent_core::Result<Value> {
    let value = if args.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str::<Value>(args)
            .map_err(|e| AgentError::config(format!("Invalid tool arguments: {e}")))?
    };
    if !value.is_object() {
        return Err(AgentError::config("Tool arguments must be a JSON object"));
    }
    debug!(tool = name, "invoking tool from REPL");
    agent.execute_tool(name, params_from_value(value)).await
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = get_history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = get_history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aigent_core::config::Config;
    use aigent_core::Backend;
    use serde_json::json;

    fn offline_agent() -> Agent {
        let mut config = Config::default();
        config.agent.backend = Backend::Llama;
        config.providers.llama.api_base = Some("http://localhost:11434".into());
        crate::build_agent(&config).unwrap()
    }

    #[test]
    fn exit_commands() {
        assert_eq!(parse_input("exit"), Some(Input::Exit));
        assert_eq!(parse_input("EXIT"), Some(Input::Exit));
        assert_eq!(parse_input("/quit"), Some(Input::Exit));
        assert_eq!(parse_input(":q"), Some(Input::Exit));
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_input("/clear"), Some(Input::Clear));
        assert_eq!(parse_input("  /Memory "), Some(Input::Memory));
        assert_eq!(parse_input("/history"), Some(Input::Memory));
    }

    #[test]
    fn tool_commands() {
        assert_eq!(parse_input("/tools"), Some(Input::Tools));
        assert_eq!(
            parse_input(r#"/tool calculator {"expression": "2 + 3"}"#),
            Some(Input::Tool {
                name: "calculator",
                args: r#"{"expression": "2 + 3"}"#
            })
        );
        assert_eq!(
            parse_input("/TOOL datetime"),
            Some(Input::Tool {
                name: "datetime",
                args: ""
            })
        );
        assert_eq!(parse_input("/tool"), Some(Input::Tool { name: "", args: "" }));
        // Only an exact `/tool` word is a command.
        assert_eq!(parse_input("/toolbox"), Some(Input::Message("/toolbox")));
    }

    #[tokio::test]
    async fn invoke_tool_runs_builtin() {
        let agent = offline_agent();
        let out = invoke_tool(&agent, "calculator", r#"{"expression": "2 + 3 * 4"}"#)
            .await
            .unwrap();
        assert_eq!(out["result"], json!(14.0));
    }

    #[tokio::test]
    async fn invoke_tool_rejects_bad_arguments() {
        let agent = offline_agent();

        let err = invoke_tool(&agent, "calculator", "{not json").await.unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("Invalid tool arguments"));

        let err = invoke_tool(&agent, "calculator", "[1, 2]").await.unwrap_err();
        assert!(err.to_string().contains("JSON object"));

        let err = invoke_tool(&agent, "calculator", "").await.unwrap_err();
        assert_eq!(err.code(), "TOOL_ERROR");

        let err = invoke_tool(&agent, "teleport", "{}").await.unwrap_err();
        assert!(err.to_string().contains("Tool 'teleport' not found"));
    }

    #[test]
    fn messages_are_trimmed() {
        assert_eq!(parse_input("  hello there \n"), Some(Input::Message("hello there")));
        assert_eq!(parse_input("   "), None);
        assert_eq!(parse_input(""), None);
    }

    #[test]
    fn history_path_under_data_dir() {
        let path = get_history_path();
        assert!(path.to_string_lossy().contains(".aigent"));
        assert!(path.to_string_lossy().contains("cli_history"));
    }
}
