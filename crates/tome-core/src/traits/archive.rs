//! Archive extraction trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TomeResult;

/// Unpacks an archive into a directory.
///
/// Implementations must either fully succeed or return an error; a failed
/// extraction is fatal to the pipeline run that requested it.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into the existing directory `destination`,
    /// overwriting entries that already exist there.
    async fn extract(&self, archive: &Path, destination: &Path) -> TomeResult<()>;

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}
