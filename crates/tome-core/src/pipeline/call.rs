//! Timeout and retry around AI-service calls.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::config::{CallPolicy, RetryPolicy};
use crate::error::{TomeError, TomeResult};
use crate::traits::{GenerationOptions, Llm, LlmResponse};
use crate::types::Message;

fn backoff(policy: &RetryPolicy) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_max_times(policy.max_retries as usize)
        .with_min_delay(Duration::from_millis(policy.initial_delay_ms))
        .with_max_delay(Duration::from_millis(policy.max_delay_ms))
        .with_factor(policy.multiplier)
}

/// Call `llm.generate`, bounding each attempt by the policy's timeout and
/// retrying transient failures with exponential backoff.
///
/// Refusals are successful responses at this layer and are never retried.
pub async fn generate_with_policy(
    llm: &dyn Llm,
    messages: &[Message],
    options: Option<GenerationOptions>,
    policy: &CallPolicy,
) -> TomeResult<LlmResponse> {
    let timeout = policy.request_timeout();

    let attempt = || async {
        match tokio::time::timeout(timeout, llm.generate(messages, options.clone())).await {
            Ok(result) => result,
            Err(_) => Err(TomeError::timeout("LLM generation", timeout)),
        }
    };

    let response = attempt
        .retry(backoff(&policy.retry))
        .when(|e: &TomeError| e.is_transient())
        .notify(|err, dur| {
            tracing::warn!("LLM call failed, retrying in {:?}: {}", dur, err);
        })
        .await?;

    if let Some(usage) = &response.usage {
        tracing::debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "LLM token usage"
        );
    }
    Ok(response)
}
