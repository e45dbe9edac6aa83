//! The metadata drafting pipeline and its components.

mod call;
mod excerpt;
mod json_parser;
mod orchestrator;
mod prompts;
mod selector;
mod structured;
mod summarizer;
mod synthesizer;
mod tree;

pub use call::generate_with_policy;
pub use excerpt::{clean_excerpt, clean_text, find_file, read_excerpt, truncate_chars, FileExcerpt};
pub use json_parser::{extract_json, parse_payload, remove_think_tags};
pub use orchestrator::{MetadataPipeline, PipelineReport, PipelineStage};
pub use prompts::{
    files_of_interest_prompt, files_of_interest_schema, metadata_prompt, summarization_prompt,
    MetadataPromptInput, FILES_OF_INTEREST_SCHEMA_NAME, METADATA_SCHEMA_NAME,
};
pub use selector::FileSelector;
pub use structured::{request_structured, request_text, Completion};
pub use summarizer::ExcerptSummarizer;
pub use synthesizer::{MetadataSynthesizer, SynthesisInput};
pub use tree::render_tree;
