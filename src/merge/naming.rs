//! File naming for saved attachments and merged output.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Prefix of every merged output file.
pub const MERGED_PREFIX: &str = "merged_";

const FALLBACK_NAME: &str = "attachment.pdf";

/// Reduce an attachment filename to a plain name inside the save folder.
///
/// Directory components from either separator style are dropped.
pub fn sanitize_filename(filename: &str) -> String {
    let leaf = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    match leaf {
        "" | "." | ".." => FALLBACK_NAME.to_string(),
        name => name.to_string(),
    }
}

/// `merged_<stem>_<n><ext>` for `filename`.
pub fn merged_file_name(filename: &str, n: u32) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    format!("{MERGED_PREFIX}{stem}_{n}{ext}")
}

/// First `merged_<stem>_<n><ext>` in `folder` that does not exist yet,
/// probing `n` upward from 1.
///
/// # Errors
///
/// Returns an I/O error if existence of a candidate cannot be determined.
pub fn next_merged_path(folder: &Path, filename: &str) -> Result<PathBuf> {
    let mut n: u32 = 1;
    loop {
        let candidate = folder.join(merged_file_name(filename, n));
        if !candidate.try_exists()? {
            return Ok(candidate);
        }
        n += 1;
    }
}
