//! Config loader — reads `~/.aigent/config.json`, merges env vars, and
//! applies legacy key migrations.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.aigent/config.json`
//! 3. Environment variables `AIGENT_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};
use crate::types::Backend;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    migrate_config(&mut raw);

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// - `agent.provider` → `agent.backend`
/// - `providers.<name>.baseURL` → `providers.<name>.apiBase`
///
/// A legacy key next to its current spelling is dropped; the current one wins.
fn migrate_config(raw: &mut serde_json::Value) {
    if let Some(agent) = raw.get_mut("agent").and_then(|a| a.as_object_mut()) {
        if let Some(provider) = agent.remove("provider") {
            if !agent.contains_key("backend") {
                agent.insert("backend".to_string(), provider);
                debug!("Migrated agent.provider → agent.backend");
            }
        }
    }

    if let Some(providers) = raw.get_mut("providers").and_then(|p| p.as_object_mut()) {
        for (name, provider) in providers.iter_mut() {
            let Some(provider) = provider.as_object_mut() else {
                continue;
            };
            let Some(base) = provider.remove("baseURL") else {
                continue;
            };
            if !provider.contains_key("apiBase") {
                provider.insert("apiBase".to_string(), base);
                debug!("Migrated providers.{name}.baseURL → apiBase");
            }
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `AIGENT_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `AIGENT_AGENT__BACKEND` → `agent.backend`
/// - `AIGENT_AGENT__MODEL` → `agent.model`
/// - `AIGENT_AGENT__TEMPERATURE` → `agent.temperature`
/// - `AIGENT_AGENT__MAX_TOKENS` → `agent.max_tokens`
/// - `AIGENT_AGENT__SYSTEM_PROMPT` → `agent.system_prompt`
/// - `AIGENT_PROVIDERS__<NAME>__API_KEY` → `providers.<name>.api_key`
/// - `AIGENT_PROVIDERS__<NAME>__API_BASE` → `providers.<name>.api_base`
/// - `AIGENT_RELAY__HOST` → `relay.host`
/// - `AIGENT_RELAY__PORT` → `relay.port`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("AIGENT_AGENT__BACKEND") {
        match val.parse::<Backend>() {
            Ok(backend) => config.agent.backend = backend,
            Err(e) => warn!("Ignoring AIGENT_AGENT__BACKEND: {e}"),
        }
    }
    if let Ok(val) = std::env::var("AIGENT_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Ok(val) = std::env::var("AIGENT_AGENT__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.agent.temperature = t;
        }
    }
    if let Ok(val) = std::env::var("AIGENT_AGENT__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tokens = Some(n);
        }
    }
    if let Ok(val) = std::env::var("AIGENT_AGENT__SYSTEM_PROMPT") {
        config.agent.system_prompt = val;
    }

    for backend in Backend::ALL {
        apply_provider_env(config.providers.get_mut(backend), backend);
    }

    if let Ok(val) = std::env::var("AIGENT_RELAY__HOST") {
        config.relay.host = val;
    }
    if let Ok(val) = std::env::var("AIGENT_RELAY__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.relay.port = p;
        }
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, backend: Backend) {
    let name = backend.as_str().to_uppercase();
    if let Ok(val) = std::env::var(format!("AIGENT_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("AIGENT_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
