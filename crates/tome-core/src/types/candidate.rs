//! Files picked by the model and the excerpts taken from them.

use serde::{Deserialize, Serialize};

/// A file the model considers relevant, with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Path relative to the archive root, as the model wrote it.
    pub file: String,
    /// Why the model picked this file.
    pub reason: String,
}

impl CandidateFile {
    pub fn new(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// Wire shape of the files-of-interest completion. Structured-output APIs
/// only accept object schemas, so the list is wrapped.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesOfInterest {
    pub files_of_interest: Vec<CandidateFile>,
}

/// A cleaned, bounded fragment of a candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excerpt {
    /// Path of the resolved file, relative to the archive root.
    pub file: String,
    /// ASCII-only, whitespace-collapsed text.
    pub excerpt: String,
    /// Justification carried over from the candidate.
    pub reason: String,
}

/// A candidate that produced no excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub file: String,
    pub cause: SkipCause,
}

/// Why a candidate was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipCause {
    /// No file under the root matched the path.
    NotFound,
    /// A file matched but could not be read.
    ReadFailed(String),
}
