use std::path::{Path, PathBuf};

use crate::error::Error;

const FALLBACK_FILE_STEM: &str = "untitled";

/// Replaces characters that are invalid in file names on common platforms.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    if trimmed.is_empty() {
        return FALLBACK_FILE_STEM.to_owned();
    }
    trimmed.to_owned()
}

pub fn markdown_path(output_dir: &Path, title: &str) -> PathBuf {
    output_dir.join(format!("{}.md", sanitize_title(title)))
}

/// Writes (or overwrites) `<output_dir>/<sanitized title>.md`.
pub fn write_markdown(output_dir: &Path, title: &str, markdown: &str) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(output_dir).map_err(|source| Error::FileWrite {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let path = markdown_path(output_dir, title);
    std::fs::write(&path, markdown).map_err(|source| Error::FileWrite {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), bytes = markdown.len(), "wrote markdown");
    Ok(path)
}
