//! tome - draft Dublin Core metadata for dataset archives.
//!
//! Extracts each ZIP archive into a scratch directory, asks the configured
//! LLM to pick informative files, summarise them and fill in the fifteen
//! DCMI elements, then prints the record as JSON.
//!
//! # Configuration
//!
//! Settings are read from `~/.config/tome/config.toml` (or `--config`),
//! then overridden by environment variables (a `.env` file is honoured):
//!
//! - `TOME_LLM_PROVIDER` - `openai`, `anthropic` or `ollama`
//! - `TOME_LLM_MODEL`, `TOME_LLM_BASE_URL`
//! - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`
//! - `TOME_SCRATCH_DIR`, `TOME_UNZIP_PROGRAM`, `TOME_MAX_CANDIDATES`
//! - `TOME_REQUEST_TIMEOUT_SECS`, `TOME_MAX_RETRIES`
//!
//! Logs go to stderr; set `RUST_LOG=tome_core=debug` to see prompts, token
//! usage and stage transitions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tome_core::{LlmProvider, MetadataPipeline, PipelineReport, TomeConfig, UnzipExtractor};
use tome_llm::LlmFactory;

/// Command-line arguments for tome
#[derive(Parser, Debug)]
#[command(name = "tome")]
#[command(about = "Draft Dublin Core metadata for ZIP dataset archives")]
#[command(version)]
struct Args {
    /// ZIP archives to describe
    #[arg(required = true)]
    archives: Vec<PathBuf>,

    /// Identifier to embed in the record (applies to every archive)
    #[arg(long)]
    id: Option<String>,

    /// Configuration file (.toml, .json or .yaml)
    #[arg(short, long, env = "TOME_CONFIG")]
    config: Option<PathBuf>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the full pipeline report instead of just the metadata
    #[arg(long)]
    report: bool,

    /// LLM provider, overriding config and environment
    #[arg(long)]
    provider: Option<String>,

    /// Model name, overriding config and environment
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    tracing::info!(
        provider = ?config.llm.provider,
        model = %config.llm.config.model,
        archives = args.archives.len(),
        "Starting tome"
    );

    let llm = LlmFactory::from_config(&config.llm).context("Failed to create LLM provider")?;
    let extractor = Arc::new(UnzipExtractor::from_config(&config.pipeline));
    let pipeline = Arc::new(
        MetadataPipeline::new(llm, extractor, &config).context("Invalid pipeline configuration")?,
    );

    if let [archive] = args.archives.as_slice() {
        let report = pipeline
            .run(archive, args.id.as_deref())
            .await
            .with_context(|| format!("Failed to describe {}", archive.display()))?;
        return write_output(&render(&report, args.report)?, args.output.as_deref());
    }

    let (output, failures) = run_all(pipeline, &args).await?;
    write_output(&output, args.output.as_deref())?;
    if failures > 0 {
        bail!("{} of {} archives failed", failures, args.archives.len());
    }
    Ok(())
}

/// Defaults, then the config file, then environment, then flags.
fn load_config(args: &Args) -> Result<TomeConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| TomeConfig::default_path().filter(|p| p.is_file()));

    let mut config = match path {
        Some(path) => TomeConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TomeConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid environment configuration")?;
    apply_flags(&mut config, args.provider.as_deref(), args.model.as_deref())?;
    Ok(config)
}

fn apply_flags(config: &mut TomeConfig, provider: Option<&str>, model: Option<&str>) -> Result<()> {
    if let Some(name) = provider {
        let Some(provider) = LlmProvider::parse(name) else {
            bail!("Unknown provider '{}'. Use openai, anthropic or ollama", name);
        };
        if provider != config.llm.provider {
            config.llm.provider = provider;
            config.llm.config.model = provider.default_model().to_string();
            // Keys are per provider; let the new one read its own variable.
            config.llm.config.api_key = None;
        }
    }
    if let Some(model) = model {
        config.llm.config.model = model.to_string();
    }
    Ok(())
}

/// Describe every archive concurrently. Failures are reported inline.
async fn run_all(pipeline: Arc<MetadataPipeline>, args: &Args) -> Result<(Value, usize)> {
    let mut tasks = JoinSet::new();
    for (index, archive) in args.archives.iter().cloned().enumerate() {
        let pipeline = pipeline.clone();
        let id = args.id.clone();
        tasks.spawn(async move {
            let result = pipeline.run(&archive, id.as_deref()).await;
            (index, archive, result)
        });
    }

    let mut entries = vec![Value::Null; args.archives.len()];
    let mut failures = 0;
    while let Some(joined) = tasks.join_next().await {
        let (index, archive, result) = joined.context("Pipeline task panicked")?;
        entries[index] = match result {
            Ok(report) => json!({
                "archive": archive,
                "result": render(&report, args.report)?,
            }),
            Err(e) => {
                failures += 1;
                tracing::error!(archive = %archive.display(), error = %e, "Archive failed");
                json!({
                    "archive": archive,
                    "error": e.to_string(),
                    "code": e.code().as_str(),
                    "suggestion": e.suggestion(),
                })
            }
        };
    }

    Ok((Value::Array(entries), failures))
}

fn render(report: &PipelineReport, full: bool) -> Result<Value> {
    let value = if full {
        serde_json::to_value(report)?
    } else {
        serde_json::to_value(&report.metadata)?
    };
    Ok(value)
}

fn write_output(value: &Value, path: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, text + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", text),
    }
    Ok(())
}
