/// Configuration module for diffctx.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// File looked up when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "diffctx.json";

// ── Default value functions ──────────────────────────────────────────

fn default_context_radius() -> usize {
    3
}

fn default_comment_markers() -> Vec<String> {
    vec!["*".to_string(), "/".to_string()]
}

fn default_before_only() -> usize {
    5
}

fn default_after_only() -> usize {
    5
}

fn default_both() -> usize {
    10
}

fn default_statement_scope() -> usize {
    5
}

fn default_accessor_annotations() -> Vec<String> {
    vec!["@Data".to_string(), "@Getter".to_string(), "@Setter".to_string()]
}

fn default_diff_line_limit() -> usize {
    10
}

fn default_rerank_threshold() -> usize {
    3
}

fn default_rerank_top_k() -> usize {
    3
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub diff: DiffConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub splitter: SplitterConfig,

    #[serde(default)]
    pub collector: CollectorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DiffConfig {
    /// Context lines around each change when locating a target hunk.
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,

    /// A diff line whose trimmed content starts with one of these is a comment.
    #[serde(default = "default_comment_markers")]
    pub comment_markers: Vec<String>,
}

/// Line caps applied by each context policy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    #[serde(default = "default_before_only")]
    pub before_only: usize,

    #[serde(default = "default_after_only")]
    pub after_only: usize,

    #[serde(default = "default_both")]
    pub both: usize,

    #[serde(default = "default_statement_scope")]
    pub statement_scope: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Class annotations implying generated accessors for every field.
    #[serde(default = "default_accessor_annotations")]
    pub accessor_annotations: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    #[serde(default = "default_diff_line_limit")]
    pub diff_line_limit: usize,

    /// Usage windows are reranked only when more than this many were found.
    #[serde(default = "default_rerank_threshold")]
    pub rerank_threshold: usize,

    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,

    #[serde(default)]
    pub clean_tests: bool,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_radius: default_context_radius(),
            comment_markers: default_comment_markers(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            before_only: default_before_only(),
            after_only: default_after_only(),
            both: default_both(),
            statement_scope: default_statement_scope(),
        }
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            accessor_annotations: default_accessor_annotations(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            diff_line_limit: default_diff_line_limit(),
            rerank_threshold: default_rerank_threshold(),
            rerank_top_k: default_rerank_top_k(),
            clean_tests: false,
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_PATH`].
    /// If the file does not exist, returns a default config and generates a
    /// template file when the default path was used.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let mut cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");

        // Ensure at least one comment marker
        if cfg.diff.comment_markers.is_empty() {
            cfg.diff.comment_markers = default_comment_markers();
        }

        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let caps = [
            ("window.before_only", self.window.before_only),
            ("window.after_only", self.window.after_only),
            ("window.both", self.window.both),
            ("window.statement_scope", self.window.statement_scope),
            ("collector.diff_line_limit", self.collector.diff_line_limit),
            ("collector.rerank_top_k", self.collector.rerank_top_k),
        ];
        for (key, value) in caps {
            anyhow::ensure!(value > 0, "{key} must be positive");
        }
        anyhow::ensure!(
            !self.diff.comment_markers.is_empty(),
            "at least one comment marker must be specified"
        );
        anyhow::ensure!(
            self.diff.comment_markers.iter().all(|m| !m.is_empty()),
            "comment markers must not be empty"
        );
        if let Some(bad) = self
            .splitter
            .accessor_annotations
            .iter()
            .find(|a| !a.starts_with('@'))
        {
            anyhow::bail!("accessor annotation must start with '@': {bad}");
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
