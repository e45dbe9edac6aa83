//! Producing the Dublin Core record from everything gathered so far.

use std::sync::Arc;

use super::prompts::{metadata_prompt, MetadataPromptInput, METADATA_SCHEMA_NAME};
use super::structured::{request_structured, Completion};
use crate::config::CallPolicy;
use crate::traits::Llm;
use crate::types::{CandidateFile, DublinCoreMetadata, Excerpt, Message};

/// Everything the synthesizer is given for one archive.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub tree: &'a str,
    pub candidates: &'a [CandidateFile],
    pub excerpts: &'a [Excerpt],
    pub summary: Option<&'a str>,
    pub identifier: Option<&'a str>,
}

/// Asks the model for a schema-constrained metadata record.
pub struct MetadataSynthesizer {
    llm: Arc<dyn Llm>,
    policy: CallPolicy,
    excerpt_length: usize,
}

impl MetadataSynthesizer {
    pub fn new(llm: Arc<dyn Llm>, policy: CallPolicy, excerpt_length: usize) -> Self {
        Self {
            llm,
            policy,
            excerpt_length,
        }
    }

    /// Produce the record, falling back to [`DublinCoreMetadata::not_available`]
    /// when the model refuses, answers with something unusable, or cannot be
    /// reached.
    pub async fn synthesize(&self, input: SynthesisInput<'_>) -> DublinCoreMetadata {
        let prompt = metadata_prompt(&MetadataPromptInput {
            tree: input.tree,
            candidates: input.candidates,
            excerpts: input.excerpts,
            summary: input.summary,
            identifier: input.identifier,
            excerpt_length: self.excerpt_length,
        });
        tracing::debug!(prompt = %prompt, "Requesting metadata");

        let completion = request_structured::<DublinCoreMetadata>(
            self.llm.as_ref(),
            &[Message::user(prompt)],
            METADATA_SCHEMA_NAME,
            DublinCoreMetadata::json_schema(),
            &self.policy,
        )
        .await;

        match completion {
            Ok(Completion::Structured(metadata)) if !metadata.title.trim().is_empty() => {
                tracing::info!(
                    title = %metadata.title,
                    populated = metadata.populated_count(),
                    "Synthesized metadata"
                );
                metadata
            }
            Ok(Completion::Structured(_)) => {
                tracing::warn!("Metadata response had an empty title");
                DublinCoreMetadata::not_available()
            }
            Ok(Completion::Refused(reason)) => {
                tracing::warn!(reason = %reason, "Model refused to produce metadata");
                DublinCoreMetadata::not_available()
            }
            Ok(Completion::Malformed(detail)) => {
                tracing::warn!(detail = %detail, "Metadata response was malformed");
                DublinCoreMetadata::not_available()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Metadata request failed");
                DublinCoreMetadata::not_available()
            }
        }
    }
}
