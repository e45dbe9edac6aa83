//! Ollama LLM provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tome_core::error::{TomeError, TomeResult};
use tome_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage,
};
use tome_core::types::Message;

use crate::http::{endpoint, post_json};

const OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama LLM provider.
pub struct OllamaLlm {
    client: Client,
    config: LlmConfig,
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider.
    pub fn new(config: LlmConfig) -> TomeResult<Self> {
        let base_url = config.base_url.as_deref().unwrap_or(OLLAMA_URL);
        let url = endpoint(base_url, "api/chat")?;

        let client = Client::builder()
            .build()
            .map_err(|e| TomeError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let mut config = config;
        if config.model.is_empty() {
            config.model = "llama3.1".to_string();
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
    ) -> ChatRequest<'a> {
        let format = match &options.response_format {
            Some(ResponseFormat::JsonSchema { schema, .. }) => Some(schema.clone()),
            Some(ResponseFormat::Json) => Some(json!("json")),
            Some(ResponseFormat::Text) | None => None,
        };

        ChatRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
            format,
            options: json!({
                "temperature": options.temperature.unwrap_or(self.config.temperature),
                "top_p": options.top_p.unwrap_or(self.config.top_p),
                "num_predict": options.max_tokens.unwrap_or(self.config.max_tokens),
            }),
        }
    }
}

fn into_response(response: ChatResponse) -> LlmResponse {
    let usage = match (response.prompt_eval_count, response.eval_count) {
        (Some(prompt), Some(completion)) => Some(TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }),
        _ => None,
    };

    LlmResponse {
        content: response.message.map(|m| m.content),
        refusal: None,
        usage,
    }
}

#[async_trait]
impl Llm for OllamaLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> TomeResult<LlmResponse> {
        let options = options.unwrap_or_default();
        let request = self.build_request(messages, &options);
        tracing::debug!(model = %self.config.model, messages = messages.len(), "Ollama request");

        let response: ChatResponse = post_json(&self.client, &self.url, &request, "Ollama").await?;
        Ok(into_response(response))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
