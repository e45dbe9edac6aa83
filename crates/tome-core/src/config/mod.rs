//! Configuration system for tome.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TomeError, TomeResult};
use crate::traits::LlmConfig;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    /// Parse a provider name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-sonnet-20240620",
            Self::Ollama => "llama3.1",
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            config: LlmConfig {
                model: LlmProvider::OpenAI.default_model().to_string(),
                ..Default::default()
            },
        }
    }
}

/// Exponential backoff applied to transient AI-service failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds).
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds).
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            multiplier: 2.0_f32,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Timeout and retry settings for each AI-service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallPolicy {
    /// Per-attempt timeout in seconds.
    pub request_timeout_secs: u64,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}

impl CallPolicy {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject a zero timeout, which would fail every call.
    pub fn validate(&self) -> TomeResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(TomeError::validation("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

/// Settings for the extraction and prompting steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory under which per-run scratch directories are created.
    pub scratch_root: PathBuf,
    /// Program invoked to unpack archives.
    pub unzip_program: String,
    /// Timeout for the extraction process in seconds.
    pub extraction_timeout_secs: u64,
    /// Maximum number of files of interest kept from the model's answer.
    pub max_candidates: usize,
    /// Maximum excerpt length fed to the summarizer.
    pub excerpt_length: usize,
    /// Maximum excerpt length embedded in the metadata prompt.
    pub metadata_excerpt_length: usize,
    /// Directory depth cap for tree rendering and file search.
    pub max_depth: usize,
    /// Subject area the summary should emphasize.
    pub summary_domain: String,
    /// Controlled vocabulary the summary should draw terms from.
    pub vocabulary: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir().join("tome"),
            unzip_program: "unzip".to_string(),
            extraction_timeout_secs: 120,
            max_candidates: 5,
            excerpt_length: 5000,
            metadata_excerpt_length: 1000,
            max_depth: 32,
            summary_domain: "agriculture".to_string(),
            vocabulary: "AGROVOC".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> TomeResult<()> {
        if self.max_candidates == 0 {
            return Err(TomeError::validation("max_candidates must be at least 1"));
        }
        if self.excerpt_length == 0 || self.metadata_excerpt_length == 0 {
            return Err(TomeError::validation("excerpt lengths must be at least 1"));
        }
        if self.extraction_timeout_secs == 0 {
            return Err(TomeError::validation("extraction_timeout_secs must be at least 1"));
        }
        if self.unzip_program.trim().is_empty() {
            return Err(TomeError::validation_with_suggestion(
                "unzip_program is empty",
                "Set unzip_program to the path of an unzip executable",
            ));
        }
        Ok(())
    }
}

/// Main tome configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomeConfig {
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
    /// AI-service call policy.
    pub call: CallPolicy,
}

impl TomeConfig {
    /// Default location of the user config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tome").join("config.toml"))
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> TomeResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| TomeError::Configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| TomeError::Configuration(e.to_string()))
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| TomeError::Configuration(e.to_string()))
            }
            _ => Err(TomeError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> TomeResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from environment variables.
    pub fn apply_env(&mut self) -> TomeResult<()> {
        if let Ok(provider) = std::env::var("TOME_LLM_PROVIDER") {
            let provider = LlmProvider::parse(&provider).ok_or_else(|| {
                TomeError::UnsupportedProvider {
                    provider: provider.clone(),
                }
            })?;
            if provider != self.llm.provider {
                self.llm.provider = provider;
                self.llm.config.model = provider.default_model().to_string();
            }
        }
        if let Ok(model) = std::env::var("TOME_LLM_MODEL") {
            self.llm.config.model = model;
        }
        if let Ok(base_url) = std::env::var("TOME_LLM_BASE_URL") {
            self.llm.config.base_url = Some(base_url);
        }
        let key_var = match self.llm.provider {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        };
        if let Some(api_key) = key_var.and_then(|v| std::env::var(v).ok()) {
            self.llm.config.api_key = Some(api_key);
        }

        if let Ok(dir) = std::env::var("TOME_SCRATCH_DIR") {
            self.pipeline.scratch_root = PathBuf::from(dir);
        }
        if let Ok(program) = std::env::var("TOME_UNZIP_PROGRAM") {
            self.pipeline.unzip_program = program;
        }
        if let Some(n) = parse_env("TOME_MAX_CANDIDATES")? {
            self.pipeline.max_candidates = n;
        }
        if let Some(secs) = parse_env("TOME_REQUEST_TIMEOUT_SECS")? {
            self.call.request_timeout_secs = secs;
        }
        if let Some(n) = parse_env("TOME_MAX_RETRIES")? {
            self.call.retry.max_retries = n;
        }

        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> TomeConfigBuilder {
        TomeConfigBuilder::default()
    }
}

fn parse_env<T: std::str::FromStr>(var: &str) -> TomeResult<Option<T>> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TomeError::Configuration(format!("{} has invalid value '{}'", var, raw))),
        Err(_) => Ok(None),
    }
}

/// Builder for TomeConfig.
#[derive(Default)]
pub struct TomeConfigBuilder {
    config: TomeConfig,
}

impl TomeConfigBuilder {
    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Set pipeline configuration.
    pub fn pipeline(mut self, config: PipelineConfig) -> Self {
        self.config.pipeline = config;
        self
    }

    /// Set the AI-service call policy.
    pub fn call_policy(mut self, policy: CallPolicy) -> Self {
        self.config.call = policy;
        self
    }

    /// Set the scratch root directory.
    pub fn scratch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pipeline.scratch_root = path.into();
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.call.retry = policy;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TomeConfig {
        self.config
    }
}
