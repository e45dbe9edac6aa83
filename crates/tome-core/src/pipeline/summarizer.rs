//! Free-text summary of the collected excerpts.

use std::sync::Arc;

use super::prompts::summarization_prompt;
use super::structured::{request_text, Completion};
use crate::config::CallPolicy;
use crate::traits::Llm;
use crate::types::{Excerpt, Message};

/// Summarises excerpts in terms of a subject domain and vocabulary.
pub struct ExcerptSummarizer {
    llm: Arc<dyn Llm>,
    policy: CallPolicy,
    domain: String,
    vocabulary: String,
}

impl ExcerptSummarizer {
    pub fn new(
        llm: Arc<dyn Llm>,
        policy: CallPolicy,
        domain: impl Into<String>,
        vocabulary: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            policy,
            domain: domain.into(),
            vocabulary: vocabulary.into(),
        }
    }

    /// Summarise `excerpts`; `None` when there is nothing to summarise or the
    /// model gave no usable answer.
    pub async fn summarize(&self, excerpts: &[Excerpt]) -> Option<String> {
        if excerpts.is_empty() {
            tracing::info!("No excerpts to summarize");
            return None;
        }

        let prompt = summarization_prompt(excerpts, &self.domain, &self.vocabulary);
        tracing::debug!(excerpts = excerpts.len(), prompt = %prompt, "Requesting summary");

        match request_text(self.llm.as_ref(), &[Message::user(prompt)], &self.policy).await {
            Ok(Completion::Structured(summary)) => Some(summary),
            Ok(Completion::Refused(reason)) => {
                tracing::warn!(reason = %reason, "Model refused to summarize");
                None
            }
            Ok(Completion::Malformed(detail)) => {
                tracing::warn!(detail = %detail, "Summary response was empty");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Summary request failed");
                None
            }
        }
    }
}
