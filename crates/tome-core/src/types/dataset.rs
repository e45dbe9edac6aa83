//! Dataset record handed to the caller's store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DublinCoreMetadata;

/// An uploaded archive and the metadata drafted for it.
///
/// The record is created with no metadata when the archive is stored and
/// receives it once a pipeline run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DublinCoreMetadata>,
    pub archive_path: PathBuf,
}

impl DatasetRecord {
    /// Create a record for a freshly stored archive.
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata: None,
            archive_path: archive_path.into(),
        }
    }

    /// Attach the pipeline's result.
    pub fn with_metadata(mut self, metadata: DublinCoreMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether a pipeline run has filled in the metadata.
    pub fn is_processed(&self) -> bool {
        self.metadata.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lifecycle() {
        let record = DatasetRecord::new("/data/Challenge_C.zip");
        assert!(!record.is_processed());

        let record = record.with_metadata(DublinCoreMetadata::new("Challenge C"));
        assert!(record.is_processed());
        assert_eq!(record.metadata.unwrap().title, "Challenge C");
    }

    #[test]
    fn test_records_get_distinct_ids() {
        let a = DatasetRecord::new("a.zip");
        let b = DatasetRecord::new("a.zip");
        assert_ne!(a.id, b.id);
    }
}
