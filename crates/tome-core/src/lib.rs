//! tome-core - Core library for tome.
//!
//! This crate provides the types, traits and pipeline that turn a ZIP
//! archive of research data into a draft Dublin Core metadata record.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tome_core::{MetadataPipeline, TomeConfig, UnzipExtractor};
//!
//! let config = TomeConfig::from_env()?;
//! let extractor = Arc::new(UnzipExtractor::from_config(&config.pipeline));
//! let pipeline = MetadataPipeline::new(llm, extractor, &config)?;
//!
//! let metadata = pipeline.describe(Path::new("survey.zip"), Some("ds-42")).await?;
//! println!("{}", metadata.title);
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use archive::{ScratchDir, UnzipExtractor};
pub use config::{CallPolicy, LlmProvider, LlmProviderConfig, PipelineConfig, RetryPolicy, TomeConfig};
pub use error::{ErrorCode, TomeError, TomeResult};
pub use pipeline::{Completion, MetadataPipeline, PipelineReport, PipelineStage};
pub use traits::{
    ArchiveExtractor, GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage,
};
pub use types::{
    CandidateFile, DatasetRecord, DcmiElement, DublinCoreMetadata, Excerpt, Message, MessageRole,
    SkipCause, SkippedCandidate, NOT_AVAILABLE,
};
