//! `aigent status` — show configuration and provider status.

use anyhow::Result;
use colored::Colorize;

use aigent_core::config::{get_config_path, load_config, Config};
use aigent_core::Backend;
use aigent_providers::validate_provider_config;

use crate::helpers::display_path;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "◆ Aigent Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        display_path(&config_path),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    let agent = &config.agent;
    println!("  {:<18} {}", "Agent:".bold(), agent.name);
    println!(
        "  {:<18} {} ({})",
        "Backend:".bold(),
        agent.backend.display_name(),
        agent.model
    );
    println!(
        "  {:<18} {}",
        "Parameters:".bold(),
        format!(
            "temp: {} | max_tokens: {}",
            agent.temperature,
            agent
                .max_tokens
                .map_or_else(|| "backend default".to_string(), |n| n.to_string())
        )
        .dimmed()
    );
    println!(
        "  {:<18} {}",
        "Memory:".bold(),
        if agent.memory.enabled {
            format!("last {} messages", agent.memory.max_messages)
        } else {
            "unbounded".to_string()
        }
    );
    println!(
        "  {:<18} {}",
        "Streaming:".bold(),
        if agent.streaming.enabled {
            format!(
                "{} chars every {}ms",
                agent.streaming.chunk_size, agent.streaming.delay_ms
            )
        } else {
            "off".to_string()
        }
    );
    if let Err(e) = agent.validate() {
        println!("  {:<18} {}", "Invalid:".bold(), e.to_string().red());
    }

    println!();
    println!("  {}", "Providers:".bold());
    for backend in Backend::ALL {
        let marker = if backend == agent.backend { "▸" } else { " " };
        println!(
            "   {marker} {:<18} {}",
            backend.display_name(),
            provider_status(&config, backend)
        );
    }

    println!();
    println!(
        "  {:<18} ws://{}:{}",
        "Relay:".bold(),
        config.relay.host,
        config.relay.port
    );
    println!();

    Ok(())
}

/// One-line credential status for a backend.
fn provider_status(config: &Config, backend: Backend) -> String {
    let provider = config.providers.get(backend);
    if !provider.is_configured() && provider.api_base.is_none() {
        return "· not configured".dimmed().to_string();
    }
    match validate_provider_config(backend, provider) {
        Ok(()) => format!("{} (configured)", "✓".green()),
        Err(e) => format!("{} {e}", "✗".red()),
    }
}
