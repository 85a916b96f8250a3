//! File system tool — read, write, and existence checks.
//!
//! Paths may start with `~/`. An optional `allowed_dir` confines every
//! operation to one directory tree.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use aigent_core::utils::expand_home;

use super::base::{optional_string, require_string, Tool};

// ─────────────────────────────────────────────
// Path helper
// ─────────────────────────────────────────────

/// Make `path` absolute and collapse `.`/`..` without touching the disk.
/// A `..` that would climb above the root is an error.
fn normalize(path: &Path) -> anyhow::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    anyhow::bail!("Invalid path '{}': escapes the root", path.display());
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Canonicalize the longest existing prefix of a normalized path and
/// re-append the part that does not exist yet.
fn resolve_links(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }

    let mut resolved = existing
        .canonicalize()
        .unwrap_or_else(|_| existing.to_path_buf());
    resolved.extend(missing.iter().rev().copied());
    resolved
}

/// Resolve a user-supplied path, optionally restricting it to `allowed_dir`.
fn resolve_path(path: &str, allowed_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let resolved = resolve_links(&normalize(&expand_home(path))?);

    if let Some(allowed) = allowed_dir {
        let allowed = resolve_links(&normalize(allowed)?);
        if !resolved.starts_with(&allowed) {
            anyhow::bail!(
                "Access denied: path '{}' is outside allowed directory '{}'",
                resolved.display(),
                allowed.display()
            );
        }
    }

    Ok(resolved)
}

// ─────────────────────────────────────────────
// FileSystemTool
// ─────────────────────────────────────────────

/// Basic file operations: `read`, `write`, `exists`.
#[derive(Debug, Default)]
pub struct FileSystemTool {
    allowed_dir: Option<PathBuf>,
}

impl FileSystemTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for FileSystemTool {
    fn name(&self) -> &str {
        "file_system"
    }

    fn description(&self) -> &str {
        "Read and write files (basic operations)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": { "type": "string", "enum": ["read", "write", "exists"] },
                "path": { "type": "string", "description": "File path" },
                "content": { "type": "string", "description": "Content for `write`" }
            },
            "required": ["operation", "path"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let operation = require_string(&params, "operation")?;
        let path_str = require_string(&params, "path")?;
        let path = resolve_path(&path_str, self.allowed_dir.as_deref())?;
        debug!(operation = %operation, path = %path.display(), "file_system");

        match operation.as_str() {
            "read" => {
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
                Ok(json!({ "content": content }))
            }
            "write" => {
                let content = optional_string(&params, "content").unwrap_or_default();
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        anyhow::anyhow!("Failed to create directory {}: {e}", parent.display())
                    })?;
                }
                tokio::fs::write(&path, content.as_bytes())
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
                Ok(json!({ "success": true, "message": "File written successfully" }))
            }
            "exists" => {
                let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
                Ok(json!({ "exists": exists }))
            }
            other => anyhow::bail!("Unsupported operation: {other}"),
        }
    }
}
