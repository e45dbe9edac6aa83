//! Core traits for tome collaborators.

mod archive;
mod llm;

pub use archive::*;
pub use llm::*;
