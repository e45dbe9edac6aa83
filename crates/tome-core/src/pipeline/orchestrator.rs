//! End-to-end metadata drafting for one archive.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tracing::Instrument;
use uuid::Uuid;

use super::excerpt::read_excerpt;
use super::selector::FileSelector;
use super::summarizer::ExcerptSummarizer;
use super::synthesizer::{MetadataSynthesizer, SynthesisInput};
use super::tree::render_tree;
use crate::archive::ScratchDir;
use crate::config::{PipelineConfig, TomeConfig};
use crate::error::{TomeError, TomeResult};
use crate::traits::{ArchiveExtractor, Llm};
use crate::types::{
    CandidateFile, DatasetRecord, DublinCoreMetadata, Excerpt, SkipCause, SkippedCandidate,
};

/// Steps of a pipeline run. `Failed` is only reachable from `Extracting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extracting,
    ListingTree,
    SelectingFiles,
    Summarizing,
    SynthesizingMetadata,
    CleaningUp,
    Done,
    Failed,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub archive: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub metadata: DublinCoreMetadata,
    pub tree: String,
    pub candidates: Vec<CandidateFile>,
    pub excerpts: Vec<Excerpt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub skipped: Vec<SkippedCandidate>,
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Default)]
struct StageTrace {
    stages: Vec<PipelineStage>,
}

impl StageTrace {
    fn enter(&mut self, stage: PipelineStage) {
        tracing::info!(stage = %stage, "Pipeline stage");
        self.stages.push(stage);
    }
}

/// Drafts Dublin Core metadata for ZIP archives.
///
/// Each run extracts into its own scratch directory, so one pipeline can
/// serve concurrent runs.
pub struct MetadataPipeline {
    extractor: Arc<dyn ArchiveExtractor>,
    selector: FileSelector,
    summarizer: ExcerptSummarizer,
    synthesizer: MetadataSynthesizer,
    config: PipelineConfig,
}

impl MetadataPipeline {
    /// Build a pipeline; fails if the configuration is invalid.
    pub fn new(
        llm: Arc<dyn Llm>,
        extractor: Arc<dyn ArchiveExtractor>,
        config: &TomeConfig,
    ) -> TomeResult<Self> {
        config.pipeline.validate()?;
        config.call.validate()?;
        let pipeline = &config.pipeline;

        tracing::info!(
            model = llm.model_name(),
            structured_output = llm.supports_structured_output(),
            extractor = extractor.name(),
            "Created metadata pipeline"
        );

        Ok(Self {
            selector: FileSelector::new(llm.clone(), config.call.clone(), pipeline.max_candidates),
            summarizer: ExcerptSummarizer::new(
                llm.clone(),
                config.call.clone(),
                pipeline.summary_domain.clone(),
                pipeline.vocabulary.clone(),
            ),
            synthesizer: MetadataSynthesizer::new(
                llm,
                config.call.clone(),
                pipeline.metadata_excerpt_length,
            ),
            extractor,
            config: pipeline.clone(),
        })
    }

    /// Run every stage for `archive`.
    ///
    /// Only a missing archive, a failed extraction or a scratch-space error
    /// returns `Err`; AI failures degrade the report instead.
    pub async fn run(&self, archive: &Path, identifier: Option<&str>) -> TomeResult<PipelineReport> {
        let is_file = tokio::fs::metadata(archive)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(TomeError::not_found(archive.display().to_string()));
        }

        let scratch = ScratchDir::create(&self.config.scratch_root).await?;
        let span = tracing::info_span!(
            "pipeline",
            run_id = %scratch.id(),
            archive = %archive.display()
        );
        self.run_in(scratch, archive, identifier).instrument(span).await
    }

    /// Run the pipeline and return only the metadata record.
    pub async fn describe(
        &self,
        archive: &Path,
        identifier: Option<&str>,
    ) -> TomeResult<DublinCoreMetadata> {
        Ok(self.run(archive, identifier).await?.metadata)
    }

    /// Describe a stored dataset, using its id as the identifier.
    pub async fn describe_dataset(&self, record: DatasetRecord) -> TomeResult<DatasetRecord> {
        let identifier = record.id.to_string();
        let metadata = self.describe(&record.archive_path, Some(&identifier)).await?;
        Ok(record.with_metadata(metadata))
    }

    async fn run_in(
        &self,
        mut scratch: ScratchDir,
        archive: &Path,
        identifier: Option<&str>,
    ) -> TomeResult<PipelineReport> {
        let mut trace = StageTrace::default();

        trace.enter(PipelineStage::Extracting);
        if let Err(e) = self.extractor.extract(archive, scratch.path()).await {
            trace.enter(PipelineStage::Failed);
            tracing::error!(error = %e, code = e.code().as_str(), "Archive extraction failed");
            if let Err(cleanup) = scratch.cleanup().await {
                tracing::warn!(error = %cleanup, "Cleanup after failed extraction failed");
            }
            return Err(e);
        }

        trace.enter(PipelineStage::ListingTree);
        let tree = self.list_tree(scratch.path()).await?;

        trace.enter(PipelineStage::SelectingFiles);
        let candidates = self.selector.select(&tree).await;
        let (excerpts, skipped) = self.collect_excerpts(scratch.path(), &candidates).await?;

        trace.enter(PipelineStage::Summarizing);
        let summary = self.summarizer.summarize(&excerpts).await;

        trace.enter(PipelineStage::SynthesizingMetadata);
        let metadata = self
            .synthesizer
            .synthesize(SynthesisInput {
                tree: &tree,
                candidates: &candidates,
                excerpts: &excerpts,
                summary: summary.as_deref(),
                identifier,
            })
            .await;

        trace.enter(PipelineStage::CleaningUp);
        if let Err(e) = scratch.cleanup().await {
            tracing::warn!(
                path = %scratch.path().display(),
                error = %e,
                "Failed to remove scratch directory"
            );
        }

        trace.enter(PipelineStage::Done);
        Ok(PipelineReport {
            run_id: scratch.id(),
            archive: archive.to_path_buf(),
            identifier: identifier.map(str::to_string),
            metadata,
            tree,
            candidates,
            excerpts,
            summary,
            skipped,
            stages: trace.stages,
        })
    }

    /// Render the tree off the async runtime; an unreadable root gives an
    /// empty tree.
    async fn list_tree(&self, root: &Path) -> TomeResult<String> {
        let root = root.to_path_buf();
        let max_depth = self.config.max_depth;
        let span = tracing::Span::current();

        let rendered = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            render_tree(&root, max_depth)
        })
        .await?;

        Ok(rendered.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to render directory tree");
            String::new()
        }))
    }

    async fn collect_excerpts(
        &self,
        root: &Path,
        candidates: &[CandidateFile],
    ) -> TomeResult<(Vec<Excerpt>, Vec<SkippedCandidate>)> {
        let root = root.to_path_buf();
        let candidates = candidates.to_vec();
        let max_chars = self.config.excerpt_length;
        let max_depth = self.config.max_depth;
        let span = tracing::Span::current();

        let collected = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            let mut excerpts = Vec::new();
            let mut skipped = Vec::new();

            for candidate in candidates {
                match read_excerpt(&root, &candidate.file, max_chars, max_depth) {
                    Ok(Some(found)) => excerpts.push(Excerpt {
                        file: found.path.to_string_lossy().into_owned(),
                        excerpt: found.text,
                        reason: candidate.reason,
                    }),
                    Ok(None) => {
                        tracing::warn!(file = %candidate.file, "Candidate file not found");
                        skipped.push(SkippedCandidate {
                            file: candidate.file,
                            cause: SkipCause::NotFound,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(file = %candidate.file, error = %e, "Failed to read candidate file");
                        skipped.push(SkippedCandidate {
                            file: candidate.file,
                            cause: SkipCause::ReadFailed(e.to_string()),
                        });
                    }
                }
            }
            (excerpts, skipped)
        })
        .await?;

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::SynthesizingMetadata.to_string(), "synthesizing_metadata");
        assert_eq!(
            serde_json::to_string(&PipelineStage::ListingTree).unwrap(),
            "\"listing_tree\""
        );
    }
}
