//! Asking the model which files in the tree are worth reading.

use std::collections::HashSet;
use std::sync::Arc;

use super::prompts::{files_of_interest_prompt, files_of_interest_schema, FILES_OF_INTEREST_SCHEMA_NAME};
use super::structured::{request_structured, Completion};
use crate::config::CallPolicy;
use crate::traits::Llm;
use crate::types::{CandidateFile, FilesOfInterest, Message};

/// Picks candidate files from a rendered directory tree.
pub struct FileSelector {
    llm: Arc<dyn Llm>,
    policy: CallPolicy,
    max_candidates: usize,
}

impl FileSelector {
    pub fn new(llm: Arc<dyn Llm>, policy: CallPolicy, max_candidates: usize) -> Self {
        Self {
            llm,
            policy,
            max_candidates,
        }
    }

    /// Select at most `max_candidates` files.
    ///
    /// Never fails: refusals, unparseable payloads and transport errors all
    /// yield an empty list.
    pub async fn select(&self, tree: &str) -> Vec<CandidateFile> {
        let prompt = files_of_interest_prompt(tree, self.max_candidates);
        tracing::debug!(prompt = %prompt, "Requesting files of interest");

        let completion = request_structured::<FilesOfInterest>(
            self.llm.as_ref(),
            &[Message::user(prompt)],
            FILES_OF_INTEREST_SCHEMA_NAME,
            files_of_interest_schema(),
            &self.policy,
        )
        .await;

        match completion {
            Ok(Completion::Structured(payload)) => {
                let candidates = normalize(payload.files_of_interest, self.max_candidates);
                tracing::info!(count = candidates.len(), "Selected files of interest");
                candidates
            }
            Ok(Completion::Refused(reason)) => {
                tracing::warn!(reason = %reason, "Model refused to select files");
                Vec::new()
            }
            Ok(Completion::Malformed(detail)) => {
                tracing::warn!(detail = %detail, "Files-of-interest response was malformed");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Files-of-interest request failed");
                Vec::new()
            }
        }
    }
}

/// Drop blank and repeated paths, keep model order, cap the list.
fn normalize(candidates: Vec<CandidateFile>, max: usize) -> Vec<CandidateFile> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !c.file.trim().is_empty())
        .filter(|c| seen.insert(c.file.trim().to_string()))
        .take(max)
        .collect()
}
