//! Aigent CLI — entry point.
//!
//! # Commands
//!
//! - `aigent chat [-m MESSAGE] [--stream]` — one-shot message or interactive REPL
//! - `aigent serve [--host HOST] [--port PORT]` — WebSocket relay for remote clients
//! - `aigent status` — show configuration and provider status
//! - `aigent onboard` — write the default config

mod helpers;
mod onboard;
mod repl;
mod serve;
mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

use aigent_agent::{default_tools, Agent, StreamChunk};
use aigent_core::config::{load_config, Config};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Aigent — LLM agent orchestration from the terminal
#[derive(Parser)]
#[command(name = "aigent", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the configured agent (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Print the response in display chunks
        #[arg(long, default_value_t = false)]
        stream: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Serve the relay hub over WebSocket
    Serve {
        /// Bind address (overrides `relay.host`)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides `relay.port`)
        #[arg(long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and provider status
    Status,

    /// Write the default configuration
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            stream,
            logs,
        } => {
            init_logging(logs);
            run_chat(message, stream).await
        }
        Commands::Serve { host, port, logs } => {
            init_logging(logs);
            let config = load_config(None);
            serve::run(&config, host, port).await
        }
        Commands::Status => status::run(),
        Commands::Onboard => onboard::run(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(message: Option<String>, stream: bool) -> Result<()> {
    let config = load_config(None);
    let stream = stream || config.agent.streaming.enabled;
    let mut agent = build_agent(&config)?;

    match message {
        Some(msg) => {
            info!(backend = %config.agent.backend, "processing single message");
            if stream {
                send_streamed(&mut agent, &msg).await?;
            } else {
                let response = agent
                    .send_message(msg)
                    .await
                    .context("agent turn failed")?;
                helpers::print_response(&response.content);
            }
        }
        None => repl::run(&mut agent, stream).await?,
    }

    Ok(())
}

/// Build an `Agent` from the loaded configuration with the built-in tools.
pub fn build_agent(config: &Config) -> Result<Agent> {
    let mut agent = Agent::new(config.agent.clone(), config.active_provider()).with_context(|| {
        format!(
            "failed to create agent for backend {}",
            config.agent.backend.display_name()
        )
    })?;
    for tool in default_tools() {
        agent.register_tool(tool);
    }
    Ok(agent)
}

/// Run one chunked turn, printing chunks as they arrive.
pub async fn send_streamed(agent: &mut Agent, content: &str) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<StreamChunk>(32);

    let printer = tokio::spawn(async move {
        helpers::print_stream_header();
        while let Some(chunk) = rx.recv().await {
            helpers::print_chunk(&chunk);
        }
    });

    let result = agent.send_message_chunked(content, &tx).await;
    drop(tx);
    printer.await.context("chunk printer task failed")?;
    result.context("agent turn failed")?;
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("aigent=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigent_core::Backend;

    #[test]
    fn cli_parses_chat_flags() {
        let cli = Cli::parse_from(["aigent", "chat", "-m", "hi", "--stream"]);
        match cli.command {
            Commands::Chat {
                message,
                stream,
                logs,
            } => {
                assert_eq!(message.as_deref(), Some("hi"));
                assert!(stream);
                assert!(!logs);
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn cli_parses_serve_overrides() {
        let cli = Cli::parse_from(["aigent", "serve", "--port", "4000"]);
        match cli.command {
            Commands::Serve { host, port, .. } => {
                assert!(host.is_none());
                assert_eq!(port, Some(4000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn build_agent_registers_builtin_tools() {
        let mut config = Config::default();
        config.agent.backend = Backend::Llama;
        config.providers.llama.api_base = Some("http://localhost:11434".into());

        let agent = build_agent(&config).unwrap();
        assert!(agent.tool_names().contains(&"calculator".to_string()));
        assert_eq!(agent.get_memory().len(), 1);
    }

    #[test]
    fn build_agent_rejects_unconfigured_backend() {
        let mut config = Config::default();
        config.agent.backend = Backend::OpenAi;
        config.providers.openai.api_key = String::new();

        assert!(build_agent(&config).is_err());
    }
}
