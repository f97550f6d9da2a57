/// Engine configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Upper bound for the undo snapshot capacity.
const MAX_UNDO_CAPACITY: usize = 10_000;

/// Upper bound for the viewport settle window.
const MAX_SETTLE_MS: u64 = 5_000;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of pre-commit snapshots kept for undo.
    pub undo_capacity: usize,
    /// Apply incoming batches immediately instead of staging them for review.
    pub auto_commit: bool,
    /// Whether next/previous diff navigation wraps around the document ends.
    pub wrap_navigation: bool,
    /// How long the viewport stabilizer keeps re-applying a restored scroll
    /// offset after the last mutation, in milliseconds.
    pub viewport_settle_ms: u64,
    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_capacity: 50,
            auto_commit: false,
            wrap_navigation: true,
            viewport_settle_ms: 50,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Returns the config file path: exe directory + `patchpad.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("patchpad.json")))
            .unwrap_or_else(|| PathBuf::from("patchpad.json"))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<EngineConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Don't overwrite a broken file
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e:#}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Clamps values to valid ranges and resets invalid fields.
    pub fn sanitize(&mut self) {
        self.undo_capacity = self.undo_capacity.clamp(1, MAX_UNDO_CAPACITY);
        self.viewport_settle_ms = self.viewport_settle_ms.min(MAX_SETTLE_MS);
        if self.log_filter.trim().is_empty() {
            self.log_filter = "info".to_string();
        }
    }
}
