//! Archive extraction through an external `unzip` process.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::PipelineConfig;
use crate::error::{TomeError, TomeResult};
use crate::traits::ArchiveExtractor;

/// Runs `unzip -o <archive> -d <destination>`.
///
/// Arguments are passed as an argv rather than through a shell, so paths
/// containing spaces or shell metacharacters need no escaping. The child is
/// killed if the timeout elapses.
#[derive(Debug, Clone)]
pub struct UnzipExtractor {
    program: String,
    timeout: Duration,
}

impl UnzipExtractor {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.unzip_program.clone(), config.extraction_timeout())
    }

    fn args(archive: &Path, destination: &Path) -> Vec<OsString> {
        vec![
            OsString::from("-o"),
            archive.as_os_str().to_os_string(),
            OsString::from("-d"),
            destination.as_os_str().to_os_string(),
        ]
    }
}

impl Default for UnzipExtractor {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[async_trait]
impl ArchiveExtractor for UnzipExtractor {
    async fn extract(&self, archive: &Path, destination: &Path) -> TomeResult<()> {
        if !archive.is_file() {
            return Err(TomeError::not_found(archive.display().to_string()));
        }

        let mut command = Command::new(&self.program);
        command
            .args(Self::args(archive, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                TomeError::timeout(format!("{} {}", self.program, archive.display()), self.timeout)
            })?
            .map_err(|e| {
                TomeError::extraction_spawn(format!("Failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TomeError::extraction(
                format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
                output.status.code(),
            ));
        }

        tracing::info!(
            archive = %archive.display(),
            destination = %destination.display(),
            "Extracted archive"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "unzip"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_with_spaces_stay_single_arguments() {
        let args = UnzipExtractor::args(
            Path::new("/data/My Dataset (final).zip"),
            Path::new("/tmp/tome/run 1"),
        );
        assert_eq!(
            args,
            vec![
                OsString::from("-o"),
                OsString::from("/data/My Dataset (final).zip"),
                OsString::from("-d"),
                OsString::from("/tmp/tome/run 1"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = UnzipExtractor::default()
            .extract(&dir.path().join("missing.zip"), dir.path())
            .await;
        assert!(matches!(result, Err(TomeError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("data.zip");
        std::fs::write(&archive, b"PK").unwrap();

        let extractor =
            UnzipExtractor::new("tome-no-such-unzip-binary", Duration::from_secs(5));
        let result = extractor.extract(&archive, dir.path()).await;
        assert!(matches!(
            result,
            Err(TomeError::Extraction {
                code: crate::error::ErrorCode::ExtSpawnFailed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_garbage_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("not a zip.zip");
        std::fs::write(&archive, b"this is not a zip archive").unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let result = UnzipExtractor::default().extract(&archive, &out).await;
        assert!(matches!(result, Err(TomeError::Extraction { .. })));
    }
}
