//! Classifying AI-service responses into parsed, refused or malformed.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::call::generate_with_policy;
use super::json_parser::parse_payload;
use crate::config::CallPolicy;
use crate::error::TomeResult;
use crate::traits::{GenerationOptions, Llm, LlmResponse};
use crate::types::Message;

/// Outcome of a completion request that reached the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    /// A usable payload.
    Structured(T),
    /// The model declined; carries its explanation.
    Refused(String),
    /// The response was empty or did not match the expected shape.
    Malformed(String),
}

impl<T> Completion<T> {
    /// The payload, if any.
    pub fn parsed(self) -> Option<T> {
        match self {
            Completion::Structured(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: DeserializeOwned> Completion<T> {
    /// Classify a response carrying a JSON payload.
    pub fn from_structured(response: LlmResponse) -> Self {
        if let Some(reason) = response.refusal {
            return Completion::Refused(reason);
        }
        match response.content {
            Some(content) if !content.trim().is_empty() => match parse_payload(&content) {
                Ok(value) => Completion::Structured(value),
                Err(e) => Completion::Malformed(e.to_string()),
            },
            _ => Completion::Malformed("Response had no content".to_string()),
        }
    }
}

impl Completion<String> {
    /// Classify a free-text response.
    pub fn from_text(response: LlmResponse) -> Self {
        if let Some(reason) = response.refusal {
            return Completion::Refused(reason);
        }
        match response.content {
            Some(content) if !content.trim().is_empty() => Completion::Structured(content),
            _ => Completion::Malformed("Response had no content".to_string()),
        }
    }
}

/// Request a completion constrained to `schema` and parse it as `T`.
///
/// `Err` is returned only for transport failures that survived the retry
/// policy.
pub async fn request_structured<T: DeserializeOwned>(
    llm: &dyn Llm,
    messages: &[Message],
    schema_name: &str,
    schema: Value,
    policy: &CallPolicy,
) -> TomeResult<Completion<T>> {
    let options = GenerationOptions::json_schema(schema_name, schema);
    let response = generate_with_policy(llm, messages, Some(options), policy).await?;
    Ok(Completion::from_structured(response))
}

/// Request a free-text completion.
pub async fn request_text(
    llm: &dyn Llm,
    messages: &[Message],
    policy: &CallPolicy,
) -> TomeResult<Completion<String>> {
    let response = generate_with_policy(llm, messages, None, policy).await?;
    Ok(Completion::from_text(response))
}
