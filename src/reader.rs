//! Markdown file discovery and reading.

use std::path::Path;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use walkdir::WalkDir;

use crate::error::{KbError, Result};
use crate::types::{title_from_path_or_heading, FileInfo};

/// Recursively discover `.md` files under `directory`, sorted by path for
/// deterministic processing order.
pub fn discover_files(directory: &Path) -> Result<Vec<FileInfo>> {
    if !directory.exists() {
        return Err(KbError::SourceNotFound(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(KbError::NotADirectory(directory.to_path_buf()));
    }

    let mut paths: Vec<_> = WalkDir::new(directory)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "md").unwrap_or(false))
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(file_info(&path)?);
    }
    Ok(files)
}

fn file_info(path: &Path) -> Result<FileInfo> {
    let content = std::fs::read_to_string(path)?;
    let metadata = std::fs::metadata(path)?;
    let last_modified: DateTime<Utc> = metadata.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());

    let first_heading = content
        .lines()
        .find(|l| l.trim_start().starts_with("# "))
        .map(|l| l.trim_start().trim_start_matches('#').trim().to_string());

    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    let checksum = format!("{:x}", hasher.finalize());

    Ok(FileInfo {
        title: title_from_path_or_heading(path, first_heading.as_deref()),
        path: path.to_path_buf(),
        last_modified,
        size_bytes: metadata.len(),
        checksum,
    })
}

/// Read a markdown file's content.
pub fn read_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_files_rejects_missing_directory() {
        let err = discover_files(Path::new("/nonexistent/path/xyz")).unwrap_err();
        assert!(matches!(err, KbError::SourceNotFound(_)));
    }

    #[test]
    fn discover_files_rejects_non_directory() {
        let tmp = std::env::temp_dir().join("mdkb_reader_test_file.md");
        std::fs::write(&tmp, "# x").unwrap();
        let err = discover_files(&tmp).unwrap_err();
        assert!(matches!(err, KbError::NotADirectory(_)));
        let _ = std::fs::remove_file(&tmp);
    }
}
