//! Text rendering of an extracted archive's directory tree.

use std::fs::DirEntry;
use std::io;
use std::path::Path;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render the tree below `root`, one line per entry.
///
/// Siblings are sorted by file name. Directories are entered depth-first
/// up to `max_depth` levels; symlinks are listed but never followed. Only a
/// failure to read `root` itself is an error; unreadable subdirectories
/// render as empty.
pub fn render_tree(root: &Path, max_depth: usize) -> io::Result<String> {
    let entries = sorted_entries(root)?;
    let mut out = String::new();
    render_level(&entries, "", 1, max_depth, &mut out);
    Ok(out)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<DirEntry>> {
    let mut entries = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn render_level(entries: &[DirEntry], prefix: &str, depth: usize, max_depth: usize, out: &mut String) {
    let last = entries.len().saturating_sub(1);

    for (index, entry) in entries.iter().enumerate() {
        let is_last = index == last;
        out.push_str(prefix);
        out.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        out.push_str(&entry.file_name().to_string_lossy());
        out.push('\n');

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || depth >= max_depth {
            continue;
        }

        match sorted_entries(&entry.path()) {
            Ok(children) => {
                let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { PIPE });
                render_level(&children, &child_prefix, depth + 1, max_depth, out);
            }
            Err(e) => tracing::warn!(
                path = %entry.path().display(),
                error = %e,
                "Skipping unreadable directory"
            ),
        }
    }
}
