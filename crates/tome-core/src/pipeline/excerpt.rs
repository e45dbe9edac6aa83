//! Locating candidate files and taking cleaned excerpts from them.
//!
//! Model-supplied paths are resolved exact-first: `root/<path>` is used when
//! it names a regular file. Otherwise the tree is searched depth-first in
//! file-name order for the first regular file whose path ends with the
//! requested components, which tolerates the model dropping leading
//! directories. Paths with `..` components never match, and no symlink is
//! followed on the way to a match.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const READ_CHUNK: usize = 8 * 1024;

/// A cleaned excerpt and the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExcerpt {
    /// Resolved path, relative to the search root.
    pub path: PathBuf,
    pub text: String,
}

/// Streaming cleaner: drops non-ASCII, collapses whitespace runs to a single
/// space, stops at `limit` characters.
///
/// Works on raw bytes. Every byte of a multi-byte UTF-8 sequence is >= 0x80,
/// so dropping those bytes is the same as dropping non-ASCII code points,
/// and invalid sequences disappear the same way.
#[derive(Debug)]
struct Cleaner {
    out: String,
    in_whitespace: bool,
    limit: usize,
}

impl Cleaner {
    fn new(limit: usize) -> Self {
        Self {
            out: String::new(),
            in_whitespace: false,
            limit,
        }
    }

    fn is_full(&self) -> bool {
        self.out.len() >= self.limit
    }

    /// Feed bytes; returns true once the limit is reached.
    fn feed(&mut self, bytes: &[u8]) -> bool {
        for &b in bytes {
            if self.is_full() {
                return true;
            }
            if !b.is_ascii() {
                continue;
            }
            // \x0B is whitespace for most regex engines but not for is_ascii_whitespace.
            if b.is_ascii_whitespace() || b == 0x0B {
                if !self.in_whitespace {
                    self.out.push(' ');
                    self.in_whitespace = true;
                }
            } else {
                self.out.push(char::from(b));
                self.in_whitespace = false;
            }
        }
        self.is_full()
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Strip non-ASCII and collapse whitespace. Idempotent.
pub fn clean_text(raw: &str) -> String {
    let mut cleaner = Cleaner::new(usize::MAX);
    cleaner.feed(raw.as_bytes());
    cleaner.finish()
}

/// Cut `text` to at most `max_chars` characters, on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Clean and truncate in one pass.
pub fn clean_excerpt(raw: &str, max_chars: usize) -> String {
    let mut cleaner = Cleaner::new(max_chars);
    cleaner.feed(raw.as_bytes());
    cleaner.finish()
}

/// Split a model-supplied path into normalised components.
pub(crate) fn requested_components(requested: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for segment in requested.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => path.push(s),
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

/// True when `root/relative` is a regular file and no component on the way
/// to it is a symlink.
fn is_contained_file(root: &Path, relative: &Path) -> bool {
    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        current.push(component);
        let Ok(meta) = std::fs::symlink_metadata(&current) else {
            return false;
        };
        if meta.file_type().is_symlink() {
            return false;
        }
        if components.peek().is_none() {
            return meta.is_file();
        }
    }
    false
}

/// Resolve `requested` beneath `root`; `None` when nothing matches.
pub fn find_file(root: &Path, requested: &str, max_depth: usize) -> Option<PathBuf> {
    let wanted = requested_components(requested)?;

    if is_contained_file(root, &wanted) {
        return Some(root.join(&wanted));
    }

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| {
            e.path()
                .strip_prefix(root)
                .map(|rel| rel.ends_with(&wanted))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
}

/// Find `requested` beneath `root` and read a cleaned excerpt of at most
/// `max_chars` characters from its head.
///
/// Returns `Ok(None)` when no file matches; an `Err` means a file matched
/// but could not be read.
pub fn read_excerpt(
    root: &Path,
    requested: &str,
    max_chars: usize,
    max_depth: usize,
) -> io::Result<Option<FileExcerpt>> {
    let Some(found) = find_file(root, requested, max_depth) else {
        return Ok(None);
    };

    let mut file = File::open(&found)?;
    let mut cleaner = Cleaner::new(max_chars);
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 || cleaner.feed(&buf[..n]) {
            break;
        }
    }

    let path = found
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or(found);
    tracing::debug!(requested, resolved = %path.display(), "Read excerpt");

    Ok(Some(FileExcerpt {
        path,
        text: cleaner.finish(),
    }))
}
