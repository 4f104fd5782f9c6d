use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub name: String,
    /// How often the consumer polls the job table when it is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Fixed backoff after an infrastructure failure before reconnecting.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            poll_interval_ms: default_poll_interval_ms(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_queue_name() -> String {
    "file_scan_queue".to_string()
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_backoff_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum number of source lines per analysis chunk.
    pub max_lines: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

impl AnalyzerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReviewConfig {
    /// Globs selecting which files in a job are reviewed.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    /// Directory where exported tabular reports are written.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            results_dir: default_results_dir(),
            title: default_title(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.cpp".to_string(),
        "**/*.h".to_string(),
        "**/*.hpp".to_string(),
    ]
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_title() -> String {
    "代码规范检查报告".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RulesConfig {
    /// Replaces the built-in rule set when non-empty.
    #[serde(default)]
    pub custom: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_lines == 0 {
        anyhow::bail!("chunking.max_lines must be > 0");
    }

    if config.queue.name.trim().is_empty() {
        anyhow::bail!("queue.name must not be empty");
    }

    if config.analyzer.is_enabled() && config.analyzer.base_url.trim().is_empty() {
        anyhow::bail!(
            "analyzer.base_url must be set when provider is '{}'",
            config.analyzer.provider
        );
    }

    match config.analyzer.provider.as_str() {
        "disabled" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown analyzer provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }

    Ok(config)
}
