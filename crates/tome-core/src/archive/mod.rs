//! Archive unpacking and scratch-space management.

mod scratch;
mod unzip;

pub use scratch::{remove_dir_all_idempotent, ScratchDir};
pub use unzip::UnzipExtractor;
