//! Integration tests for the metadata pipeline.
//!
//! Archives are simulated by an extractor that writes fixture files, and the
//! model by a scripted LLM that answers according to the requested schema.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tome_core::pipeline::{FILES_OF_INTEREST_SCHEMA_NAME, METADATA_SCHEMA_NAME};
use tome_core::{
    ArchiveExtractor, CallPolicy, CandidateFile, DatasetRecord, DublinCoreMetadata,
    GenerationOptions, Llm, LlmResponse, Message, MetadataPipeline, PipelineStage,
    ResponseFormat, RetryPolicy, SkipCause, TomeConfig, TomeError, TomeResult, UnzipExtractor,
};

/// Answers each pipeline request with a canned response.
#[derive(Default)]
struct ScriptedLlm {
    files_of_interest: Option<LlmResponse>,
    summary: Option<LlmResponse>,
    metadata: Option<LlmResponse>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn happy_path() -> Self {
        Self {
            files_of_interest: Some(LlmResponse::text(
                r#"{"files_of_interest": [{"file": "readme.txt", "reason": "contains description"}]}"#,
            )),
            summary: Some(LlmResponse::text("a readme file")),
            metadata: Some(LlmResponse::text(r#"{"title": "Test Dataset"}"#)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> TomeResult<LlmResponse> {
        if let Some(message) = messages.last() {
            self.prompts.lock().unwrap().push(message.content.clone());
        }

        let scripted = match options.and_then(|o| o.response_format) {
            Some(ResponseFormat::JsonSchema { name, .. }) if name == FILES_OF_INTEREST_SCHEMA_NAME => {
                &self.files_of_interest
            }
            Some(ResponseFormat::JsonSchema { name, .. }) if name == METADATA_SCHEMA_NAME => {
                &self.metadata
            }
            _ => &self.summary,
        };
        scripted
            .clone()
            .ok_or_else(|| TomeError::llm_unavailable("no scripted response"))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Writes fixture files keyed by the archive's file name.
#[derive(Default)]
struct FixtureExtractor {
    archives: HashMap<String, Vec<(&'static str, Vec<u8>)>>,
    seen: Mutex<Vec<PathBuf>>,
}

impl FixtureExtractor {
    fn with_archive(mut self, name: &str, files: Vec<(&'static str, Vec<u8>)>) -> Self {
        self.archives.insert(name.to_string(), files);
        self
    }
}

#[async_trait]
impl ArchiveExtractor for FixtureExtractor {
    async fn extract(&self, archive: &Path, destination: &Path) -> TomeResult<()> {
        self.seen.lock().unwrap().push(destination.to_path_buf());

        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let files = self
            .archives
            .get(&name)
            .ok_or_else(|| TomeError::extraction(format!("{name}: not a zip archive"), Some(9)))?;

        for (path, content) in files {
            let target = destination.join(path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(target, content).await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

/// Unpacks part of the archive, then fails the way a truncated zip does.
struct TruncatedExtractor;

#[async_trait]
impl ArchiveExtractor for TruncatedExtractor {
    async fn extract(&self, _archive: &Path, destination: &Path) -> TomeResult<()> {
        tokio::fs::create_dir_all(destination.join("survey/docs")).await?;
        tokio::fs::write(destination.join("survey/docs/README.md"), "Maize trials").await?;
        tokio::fs::write(destination.join("survey/yields.csv"), "plot,yield").await?;
        Err(TomeError::extraction(
            "survey/raw.bin: unexpected end of archive",
            Some(3),
        ))
    }

    fn name(&self) -> &str {
        "truncated"
    }
}

/// Panics on the first request.
struct PanickingLlm;

#[async_trait]
impl Llm for PanickingLlm {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> TomeResult<LlmResponse> {
        panic!("model client crashed");
    }

    fn model_name(&self) -> &str {
        "panicking"
    }
}

/// Never answers within the test's patience.
struct StalledLlm;

#[async_trait]
impl Llm for StalledLlm {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> TomeResult<LlmResponse> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(LlmResponse::text("too late"))
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    scratch_root: PathBuf,
    uploads: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let scratch_root = dir.path().join("scratch");
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&scratch_root).unwrap();
        std::fs::create_dir_all(&uploads).unwrap();
        Self {
            _dir: dir,
            scratch_root,
            uploads,
        }
    }

    fn config(&self) -> TomeConfig {
        TomeConfig::builder()
            .scratch_root(&self.scratch_root)
            .call_policy(CallPolicy {
                request_timeout_secs: 5,
                retry: RetryPolicy::none(),
            })
            .build()
    }

    fn upload(&self, name: &str) -> PathBuf {
        let path = self.uploads.join(name);
        std::fs::write(&path, b"PK\x03\x04placeholder").unwrap();
        path
    }

    fn scratch_entries(&self) -> usize {
        std::fs::read_dir(&self.scratch_root).unwrap().count()
    }

    fn pipeline(&self, llm: ScriptedLlm, extractor: FixtureExtractor) -> MetadataPipeline {
        MetadataPipeline::new(Arc::new(llm), Arc::new(extractor), &self.config()).unwrap()
    }
}

fn readme_archive() -> Vec<(&'static str, Vec<u8>)> {
    vec![("readme.txt", b"x".repeat(100))]
}

#[tokio::test]
async fn test_end_to_end_readme_archive() {
    let harness = Harness::new();
    let archive = harness.upload("dataset.zip");
    let llm = Arc::new(ScriptedLlm::happy_path());
    let extractor = FixtureExtractor::default().with_archive("dataset.zip", readme_archive());
    let pipeline =
        MetadataPipeline::new(llm.clone(), Arc::new(extractor), &harness.config()).unwrap();

    let report = pipeline.run(&archive, Some("ds-1")).await.unwrap();

    assert_eq!(report.metadata, DublinCoreMetadata::new("Test Dataset"));
    assert_eq!(
        serde_json::to_value(&report.metadata).unwrap(),
        serde_json::json!({"title": "Test Dataset"})
    );
    assert_eq!(report.tree, "└── readme.txt\n");
    assert_eq!(
        report.candidates,
        vec![CandidateFile::new("readme.txt", "contains description")]
    );
    assert_eq!(report.excerpts.len(), 1);
    assert_eq!(report.excerpts[0].excerpt, "x".repeat(100));
    assert_eq!(report.summary.as_deref(), Some("a readme file"));
    assert!(report.skipped.is_empty());
    assert_eq!(
        report.stages,
        vec![
            PipelineStage::Extracting,
            PipelineStage::ListingTree,
            PipelineStage::SelectingFiles,
            PipelineStage::Summarizing,
            PipelineStage::SynthesizingMetadata,
            PipelineStage::CleaningUp,
            PipelineStage::Done,
        ]
    );
    assert_eq!(harness.scratch_entries(), 0);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("readme.txt"));
    assert!(prompts[1].contains(&"x".repeat(100)));
    assert!(prompts[2].contains("a readme file"));
    assert!(prompts[2].contains("ds-1"));
}

#[tokio::test]
async fn test_failed_extraction_leaves_no_scratch_dir() {
    let harness = Harness::new();
    let archive = harness.upload("corrupt.zip");
    let pipeline = harness.pipeline(ScriptedLlm::happy_path(), FixtureExtractor::default());

    let err = pipeline.run(&archive, None).await.unwrap_err();

    assert!(matches!(err, TomeError::Extraction { exit_code: Some(9), .. }));
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_partial_extraction_is_cleaned_up() {
    let harness = Harness::new();
    let archive = harness.upload("truncated.zip");
    let pipeline = MetadataPipeline::new(
        Arc::new(ScriptedLlm::happy_path()),
        Arc::new(TruncatedExtractor),
        &harness.config(),
    )
    .unwrap();

    let err = pipeline.run(&archive, None).await.unwrap_err();

    assert!(matches!(err, TomeError::Extraction { exit_code: Some(3), .. }));
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_panic_during_ai_step_removes_scratch_dir() {
    let harness = Harness::new();
    let archive = harness.upload("dataset.zip");
    let extractor = Arc::new(
        FixtureExtractor::default().with_archive("dataset.zip", readme_archive()),
    );
    let pipeline = Arc::new(
        MetadataPipeline::new(Arc::new(PanickingLlm), extractor.clone(), &harness.config())
            .unwrap(),
    );

    let task = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.run(&archive, None).await }
    });
    let joined = task.await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(extractor.seen.lock().unwrap().len(), 1);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_cancelled_run_removes_scratch_dir() {
    let harness = Harness::new();
    let archive = harness.upload("dataset.zip");
    let extractor = Arc::new(
        FixtureExtractor::default().with_archive("dataset.zip", readme_archive()),
    );
    let pipeline =
        MetadataPipeline::new(Arc::new(StalledLlm), extractor.clone(), &harness.config())
            .unwrap();

    let outcome =
        tokio::time::timeout(Duration::from_millis(200), pipeline.run(&archive, None)).await;

    assert!(outcome.is_err());
    assert_eq!(extractor.seen.lock().unwrap().len(), 1);
    assert_eq!(harness.scratch_entries(), 0);
}

#[test]
fn test_zero_timeouts_are_rejected() {
    let harness = Harness::new();
    let mut config = harness.config();
    config.call.request_timeout_secs = 0;
    let result = MetadataPipeline::new(
        Arc::new(ScriptedLlm::happy_path()),
        Arc::new(FixtureExtractor::default()),
        &config,
    );
    assert!(matches!(result, Err(TomeError::Validation { .. })));

    let mut config = harness.config();
    config.pipeline.extraction_timeout_secs = 0;
    let result = MetadataPipeline::new(
        Arc::new(ScriptedLlm::happy_path()),
        Arc::new(FixtureExtractor::default()),
        &config,
    );
    assert!(matches!(result, Err(TomeError::Validation { .. })));
}

#[tokio::test]
async fn test_unzip_rejects_garbage_archive() {
    let harness = Harness::new();
    let archive = harness.upload("garbage archive.zip");
    let config = harness.config();
    let extractor = Arc::new(UnzipExtractor::from_config(&config.pipeline));
    let pipeline =
        MetadataPipeline::new(Arc::new(ScriptedLlm::happy_path()), extractor, &config).unwrap();

    let err = pipeline.run(&archive, None).await.unwrap_err();

    assert!(matches!(err, TomeError::Extraction { .. }), "got {err:?}");
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_missing_archive_is_not_found() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(ScriptedLlm::happy_path(), FixtureExtractor::default());

    let err = pipeline
        .run(&harness.uploads.join("missing.zip"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, TomeError::NotFound { .. }));
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_refusals_degrade_to_not_available() {
    let harness = Harness::new();
    let archive = harness.upload("dataset.zip");
    let llm = ScriptedLlm {
        files_of_interest: Some(LlmResponse::refused("I can't help with that")),
        summary: Some(LlmResponse::text("unused")),
        metadata: Some(LlmResponse::refused("I can't help with that")),
        ..Default::default()
    };
    let extractor = FixtureExtractor::default().with_archive("dataset.zip", readme_archive());
    let pipeline = harness.pipeline(llm, extractor);

    let report = pipeline.run(&archive, None).await.unwrap();

    assert!(report.candidates.is_empty());
    assert!(report.excerpts.is_empty());
    assert!(report.summary.is_none());
    assert!(report.metadata.is_not_available());
    assert_eq!(report.stages.last(), Some(&PipelineStage::Done));
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_unreachable_service_still_cleans_up() {
    let harness = Harness::new();
    let archive = harness.upload("dataset.zip");
    let extractor = FixtureExtractor::default().with_archive("dataset.zip", readme_archive());
    let pipeline = harness.pipeline(ScriptedLlm::default(), extractor);

    let metadata = pipeline.describe(&archive, None).await.unwrap();

    assert!(metadata.is_not_available());
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_missing_candidates_are_skipped() {
    let harness = Harness::new();
    let archive = harness.upload("survey.zip");
    let llm = ScriptedLlm {
        files_of_interest: Some(LlmResponse::text(
            r#"{"files_of_interest": [
                {"file": "missing.csv", "reason": "data"},
                {"file": "docs/README.md", "reason": "documentation"}
            ]}"#,
        )),
        ..ScriptedLlm::happy_path()
    };
    let extractor = FixtureExtractor::default().with_archive(
        "survey.zip",
        vec![
            ("survey/docs/README.md", b"Maize \xc3\xa9  trials\n\n2021".to_vec()),
            ("survey/yields.csv", b"plot,yield".to_vec()),
        ],
    );
    let pipeline = harness.pipeline(llm, extractor);

    let report = pipeline.run(&archive, None).await.unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].file, "missing.csv");
    assert_eq!(report.skipped[0].cause, SkipCause::NotFound);
    assert_eq!(report.excerpts.len(), 1);
    assert_eq!(
        Path::new(&report.excerpts[0].file),
        Path::new("survey/docs/README.md")
    );
    assert_eq!(report.excerpts[0].excerpt, "Maize trials 2021");
    assert_eq!(report.metadata.title, "Test Dataset");
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let harness = Harness::new();
    let first = harness.upload("first.zip");
    let second = harness.upload("second.zip");
    let extractor = Arc::new(
        FixtureExtractor::default()
            .with_archive("first.zip", vec![("readme.txt", b"first".to_vec())])
            .with_archive("second.zip", vec![("readme.txt", b"second".to_vec())]),
    );
    let pipeline = MetadataPipeline::new(
        Arc::new(ScriptedLlm::happy_path()),
        extractor.clone(),
        &harness.config(),
    )
    .unwrap();

    let (a, b) = tokio::join!(pipeline.run(&first, None), pipeline.run(&second, None));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.excerpts[0].excerpt, "first");
    assert_eq!(b.excerpts[0].excerpt, "second");
    assert_eq!(a.metadata.title, "Test Dataset");
    assert_eq!(b.metadata.title, "Test Dataset");

    let seen = extractor.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_ne!(seen[0], seen[1]);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_describe_dataset_record() {
    let harness = Harness::new();
    let archive = harness.upload("dataset.zip");
    let extractor = FixtureExtractor::default().with_archive("dataset.zip", readme_archive());
    let pipeline = harness.pipeline(ScriptedLlm::happy_path(), extractor);

    let record = DatasetRecord::new(&archive);
    let id = record.id;
    assert!(!record.is_processed());

    let record = pipeline.describe_dataset(record).await.unwrap();

    assert_eq!(record.id, id);
    assert!(record.is_processed());
    assert_eq!(
        record.metadata.as_ref().map(|m| m.title.as_str()),
        Some("Test Dataset")
    );
}
