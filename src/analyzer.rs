//! Analysis backend abstraction and implementations.
//!
//! Defines the [`AnalysisBackend`] capability trait and concrete
//! implementations:
//! - **[`DisabledBackend`]** — returns errors; used when no backend is configured.
//! - **[`OllamaBackend`]** — calls a local Ollama server over HTTP.
//!
//! The backend receives a prompt and returns free-form text. Its output is
//! untrusted: it may ignore the requested grammar entirely, and the response
//! parser drops whatever does not match. A separate liveness probe
//! ([`AnalysisBackend::health`]) must succeed before a job counts as
//! processed.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::AnalyzerConfig;
use crate::parse::NO_ISSUES_SENTINEL;

/// External reasoning capability: one prompt in, free-form text out.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Model identifier for logging (e.g. `"deepseek-r1:7b"`).
    fn model_name(&self) -> &str;

    /// Send one prompt and return the raw response text.
    ///
    /// May block on network I/O and fail with transient infrastructure
    /// errors; callers log and skip the chunk rather than aborting the job.
    async fn analyze(&self, prompt: &str) -> Result<String>;

    /// Liveness probe, queryable independently of any analysis call.
    async fn health(&self) -> Result<()>;
}

/// Build the analysis prompt for one chunk.
///
/// Deterministic template: enumerated rule list, the chunk text, and the
/// fixed output-grammar instruction. Not a negotiation protocol.
pub fn build_prompt(rules: &[String], chunk_text: &str) -> String {
    let rules_str = rules.join("\n");

    format!(
        "你是一个C++专家，正在检查代码是否符合代码规范。请遵循以下规则：\n\
        {rules_str}\n\n\
        输出格式要求：\n\
        1. 按行分析，每行格式：[行号]:[规则编号]:[问题描述]:[建议修正]\n\
        2. 行号为该代码片段内的相对行号，从0开始\n\
        3. 问题描述中不得包含冒号\n\
        4. 如果没有问题，只输出\"{NO_ISSUES_SENTINEL}\"\n\
        5. 示例：\n\
           42:规则2:危险的类型转换:使用static_cast<int>(value)代替(int)value\n\n\
        请开始分析以下C++代码片段：\n{chunk_text}"
    )
}

// ============ Disabled Backend ============

/// A no-op backend that always returns errors.
///
/// Used when `analyzer.provider = "disabled"`; lets the submission path and
/// queue run without a model attached.
pub struct DisabledBackend;

#[async_trait]
impl AnalysisBackend for DisabledBackend {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn analyze(&self, _prompt: &str) -> Result<String> {
        bail!("Analysis backend is disabled")
    }

    async fn health(&self) -> Result<()> {
        bail!("Analysis backend is disabled")
    }
}

// ============ Ollama Backend ============

/// Analysis backend backed by a local Ollama server.
///
/// Calls `POST /api/generate` with streaming disabled and reads the
/// `response` field. `GET /api/tags` serves as the liveness probe.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("analyzer.model required for Ollama backend"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl AnalysisBackend for OllamaBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .context("analysis backend unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .context("analysis backend unreachable")?;

        if !response.status().is_success() {
            bail!("analysis backend returned {}", response.status());
        }
        Ok(())
    }
}

/// Create the appropriate [`AnalysisBackend`] based on configuration.
pub fn create_backend(config: &AnalyzerConfig) -> Result<Box<dyn AnalysisBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "ollama" => Ok(Box::new(OllamaBackend::new(config)?)),
        other => bail!("Unknown analyzer provider: {}", other),
    }
}
