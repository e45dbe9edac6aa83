//! Core types for tome.

mod candidate;
mod dataset;
mod message;
mod metadata;

pub use candidate::*;
pub use dataset::*;
pub use message::*;
pub use metadata::*;
