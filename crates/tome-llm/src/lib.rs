//! tome-llm - LLM provider implementations for tome.
//!
//! Every provider talks to its HTTP API directly through `reqwest` and
//! implements [`tome_core::Llm`], including schema-constrained output and
//! refusal reporting.
//!
//! # Supported Providers
//!
//! - **OpenAI** - GPT-4o and friends, native JSON-schema output
//! - **Anthropic** - Claude models, schema given as a system instruction
//! - **Ollama** - Local models, schema passed as the `format` field
//!
//! # Example
//!
//! ```ignore
//! use tome_core::TomeConfig;
//! use tome_llm::LlmFactory;
//!
//! let config = TomeConfig::from_env()?;
//! let llm = LlmFactory::from_config(&config.llm)?;
//! ```

mod anthropic;
mod factory;
mod http;
mod ollama;
mod openai;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use ollama::OllamaLlm;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use tome_core::config::LlmProvider;
pub use tome_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
