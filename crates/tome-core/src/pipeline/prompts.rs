//! Prompt templates for the metadata pipeline.

use std::fmt::Write;
use std::path::Path;

use serde_json::{json, Value};

use super::excerpt::{requested_components, truncate_chars};
use crate::types::{CandidateFile, Excerpt, NOT_AVAILABLE};

/// Schema name sent with the files-of-interest request.
pub const FILES_OF_INTEREST_SCHEMA_NAME: &str = "files_of_interest";

/// Schema name sent with the metadata request.
pub const METADATA_SCHEMA_NAME: &str = "dcmi_metadata";

/// Strict schema for `{files_of_interest: [{file, reason}]}`.
pub fn files_of_interest_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "files_of_interest": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "file": {
                            "type": "string",
                            "description": "The relative path of the file."
                        },
                        "reason": {
                            "type": "string",
                            "description": "The reason why this file is of interest."
                        }
                    },
                    "required": ["file", "reason"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["files_of_interest"],
        "additionalProperties": false
    })
}

/// Ask the model to pick files worth reading from the tree.
pub fn files_of_interest_prompt(tree: &str, max_files: usize) -> String {
    format!(
        r#"You are helping to describe a dataset that was uploaded as an archive.
Below is the directory structure of the extracted archive. Identify the files
whose opening text is most likely to help write descriptive metadata for the
dataset: READMEs, documentation, data dictionaries, licences, citation files,
and representative data files. Judge by file names, extensions, and where the
files sit in the tree.

Select at most {max_files} files. Give each file's path relative to the archive
root exactly as it appears in the tree, together with a short reason for
choosing it.

Directory Structure:
{tree}"#
    )
}

/// Ask the model to summarise the excerpts, favouring a controlled vocabulary.
pub fn summarization_prompt(excerpts: &[Excerpt], domain: &str, vocabulary: &str) -> String {
    let mut sections = String::new();
    for excerpt in excerpts {
        let _ = write!(
            sections,
            "\nFile: {}\nExcerpt: {}\nReason: {}\n",
            excerpt.file, excerpt.excerpt, excerpt.reason
        );
    }

    format!(
        r#"Summarize the key information in the following file excerpts from a dataset.
Highlight {domain}-related data and use {vocabulary} terms where appropriate.
Write the summary as free-form text.

File Excerpts:
{sections}"#
    )
}

/// Inputs to the final metadata prompt.
#[derive(Debug, Clone, Copy)]
pub struct MetadataPromptInput<'a> {
    pub tree: &'a str,
    pub candidates: &'a [CandidateFile],
    pub excerpts: &'a [Excerpt],
    pub summary: Option<&'a str>,
    pub identifier: Option<&'a str>,
    pub excerpt_length: usize,
}

/// Whether `resolved` is the file found for `requested`, using the same
/// normalisation as the file lookup.
fn same_file(resolved: &str, requested: &str) -> bool {
    requested_components(requested)
        .map(|wanted| Path::new(resolved).ends_with(wanted))
        .unwrap_or(false)
}

/// Ask the model for the Dublin Core record.
pub fn metadata_prompt(input: &MetadataPromptInput<'_>) -> String {
    let mut files = String::new();
    for candidate in input.candidates {
        let excerpt = input
            .excerpts
            .iter()
            .find(|e| e.reason == candidate.reason && same_file(&e.file, &candidate.file))
            .map(|e| truncate_chars(&e.excerpt, input.excerpt_length))
            .unwrap_or("(file could not be read)");
        let _ = write!(
            files,
            "File: {}\nExcerpt:\n{}\nReason: {}\n\n",
            candidate.file, excerpt, candidate.reason
        );
    }
    if files.is_empty() {
        files.push_str("(no files were selected)\n");
    }

    let mut prompt = format!(
        r#"Here is the directory structure of a dataset archive, followed by the opening
text of the files identified as most informative.

Directory Structure:
{tree}
Files of Interest:
{files}"#,
        tree = input.tree,
    );

    if let Some(summary) = input.summary {
        let _ = write!(prompt, "Summary of the file contents:\n{}\n\n", summary);
    }
    if let Some(identifier) = input.identifier.filter(|id| !id.trim().is_empty()) {
        let _ = write!(
            prompt,
            "The dataset is registered under the identifier \"{}\".\n\n",
            identifier
        );
    }

    let _ = write!(
        prompt,
        r#"Using this information, generate Dublin Core Metadata Initiative (DCMI)
metadata for the dataset. Each element must reflect the content and context of
the files. If an element cannot be determined from the information provided,
set it to "{NOT_AVAILABLE}"."#
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpt(file: &str, text: &str, reason: &str) -> Excerpt {
        Excerpt {
            file: file.to_string(),
            excerpt: text.to_string(),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_files_of_interest_prompt() {
        let prompt = files_of_interest_prompt("└── readme.txt\n", 5);
        assert!(prompt.contains("at most 5 files"));
        assert!(prompt.ends_with("└── readme.txt\n"));
    }

    #[test]
    fn test_schema_wraps_list() {
        let schema = files_of_interest_schema();
        assert_eq!(schema["properties"]["files_of_interest"]["type"], "array");
        assert_eq!(schema["required"][0], "files_of_interest");
    }

    #[test]
    fn test_summarization_prompt_lists_excerpts() {
        let prompt = summarization_prompt(
            &[excerpt("readme.txt", "Maize trials 2021", "contains description")],
            "agriculture",
            "AGROVOC",
        );
        assert!(prompt.contains("File: readme.txt\nExcerpt: Maize trials 2021\nReason: contains description"));
        assert!(prompt.contains("AGROVOC"));
        assert!(prompt.contains("agriculture-related"));
    }

    #[test]
    fn test_metadata_prompt_truncates_excerpts() {
        let candidates = [CandidateFile::new("readme.txt", "contains description")];
        let excerpts = [excerpt("readme.txt", &"x".repeat(50), "contains description")];
        let prompt = metadata_prompt(&MetadataPromptInput {
            tree: "└── readme.txt\n",
            candidates: &candidates,
            excerpts: &excerpts,
            summary: Some("a readme file"),
            identifier: Some("ds-42"),
            excerpt_length: 10,
        });

        assert!(prompt.contains(&format!("Excerpt:\n{}\n", "x".repeat(10))));
        assert!(!prompt.contains(&"x".repeat(11)));
        assert!(prompt.contains("Summary of the file contents:\na readme file"));
        assert!(prompt.contains("\"ds-42\""));
        assert!(prompt.contains(NOT_AVAILABLE));
    }

    #[test]
    fn test_metadata_prompt_pairs_suffix_matched_excerpts() {
        let candidates = [CandidateFile::new("./docs/README.md", "documentation")];
        let excerpts = [excerpt("survey/docs/README.md", "Plot layout", "documentation")];
        let prompt = metadata_prompt(&MetadataPromptInput {
            tree: "",
            candidates: &candidates,
            excerpts: &excerpts,
            summary: None,
            identifier: None,
            excerpt_length: 1000,
        });
        assert!(prompt.contains("File: ./docs/README.md\nExcerpt:\nPlot layout\n"));
    }

    #[test]
    fn test_metadata_prompt_pairs_backslash_paths() {
        let candidates = [CandidateFile::new("survey\\docs\\README.md", "documentation")];
        let excerpts = [excerpt("survey/docs/README.md", "Plot layout", "documentation")];
        let prompt = metadata_prompt(&MetadataPromptInput {
            tree: "",
            candidates: &candidates,
            excerpts: &excerpts,
            summary: None,
            identifier: None,
            excerpt_length: 1000,
        });
        assert!(prompt.contains("File: survey\\docs\\README.md\nExcerpt:\nPlot layout\n"));
        assert!(!prompt.contains("(file could not be read)"));
    }

    #[test]
    fn test_metadata_prompt_marks_unreadable_candidates() {
        let candidates = [CandidateFile::new("missing.csv", "data")];
        let prompt = metadata_prompt(&MetadataPromptInput {
            tree: "",
            candidates: &candidates,
            excerpts: &[],
            summary: None,
            identifier: Some("  "),
            excerpt_length: 1000,
        });
        assert!(prompt.contains("(file could not be read)"));
        assert!(!prompt.contains("Summary of the file contents"));
        assert!(!prompt.contains("registered under"));
    }
}
