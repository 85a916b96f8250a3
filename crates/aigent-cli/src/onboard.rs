//! `aigent onboard` — write the default configuration.
//!
//! Creates `~/.aigent/config.json` with defaults (never overwriting an
//! existing file) and the REPL history directory.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use aigent_core::config::{get_config_path, save_config, Config};
use aigent_core::utils::get_history_path;

use crate::helpers::display_path;

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "◆ Aigent — Setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    if write_default_config(&config_path)? {
        println!("  {} created config at {}", "✓".green(), display_path(&config_path));
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            display_path(&config_path)
        );
    }

    if let Some(history_dir) = get_history_path().parent() {
        std::fs::create_dir_all(history_dir)
            .with_context(|| format!("failed to create {}", history_dir.display()))?;
        println!("  {} history dir at {}", "✓".green(), display_path(history_dir));
    }

    println!();
    println!(
        "{}",
        "  Setup complete! Add an API key under `providers`, then run `aigent chat`.".green()
    );
    println!();

    Ok(())
}

/// Write the default config to `path` unless a file is already there.
/// Returns whether a file was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
