//! Anthropic (Claude) LLM provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use tome_core::error::{TomeError, TomeResult};
use tome_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage,
};
use tome_core::types::{Message, MessageRole};

use crate::http::{endpoint, post_json};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic LLM provider.
///
/// The Messages API has no schema-constrained mode, so a requested JSON
/// schema is appended to the system prompt.
pub struct AnthropicLlm {
    client: Client,
    config: LlmConfig,
    url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicLlm {
    /// Create a new Anthropic LLM provider.
    pub fn new(config: LlmConfig) -> TomeResult<Self> {
        let api_key: SecretString = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .map(SecretString::new)
            .ok_or_else(|| {
                TomeError::Configuration("Anthropic API key not found. Set ANTHROPIC_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            api_key
                .expose_secret()
                .parse()
                .map_err(|_| TomeError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            ANTHROPIC_VERSION
                .parse()
                .map_err(|_| TomeError::Configuration("Invalid version header".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TomeError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL);
        let url = endpoint(base_url, "messages")?;

        let mut config = config;
        if config.model.is_empty() {
            config.model = "claude-3-5-sonnet-20240620".to_string();
        }

        Ok(Self {
            client,
            config,
            url,
        })
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        options: &GenerationOptions,
    ) -> AnthropicRequest<'a> {
        let mut system: Vec<String> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone())
            .collect();
        if let Some(instruction) = options.response_format.as_ref().and_then(format_instruction) {
            system.push(instruction);
        }

        AnthropicRequest {
            model: &self.config.model,
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| AnthropicMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        }
    }
}

fn format_instruction(format: &ResponseFormat) -> Option<String> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::Json => {
            Some("Respond with a single valid JSON object and nothing else.".to_string())
        }
        ResponseFormat::JsonSchema { schema, .. } => Some(format!(
            "Respond with a single JSON object that conforms to this JSON schema, and nothing else:\n{}",
            schema
        )),
    }
}

fn into_response(response: AnthropicResponse) -> LlmResponse {
    let text: String = response
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text.as_deref())
        .collect();
    let content = (!text.is_empty()).then_some(text);

    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u.input_tokens + u.output_tokens,
    });

    if response.stop_reason.as_deref() == Some("refusal") {
        return LlmResponse {
            refusal: Some(content.unwrap_or_else(|| "Model declined to respond".to_string())),
            content: None,
            usage,
        };
    }

    LlmResponse {
        content,
        refusal: None,
        usage,
    }
}

#[async_trait]
impl Llm for AnthropicLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> TomeResult<LlmResponse> {
        let options = options.unwrap_or_default();
        let request = self.build_request(messages, &options);
        tracing::debug!(model = %self.config.model, messages = request.messages.len(), "Anthropic request");

        let response: AnthropicResponse =
            post_json(&self.client, &self.url, &request, "Anthropic").await?;
        Ok(into_response(response))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_structured_output(&self) -> bool {
        false
    }
}
