use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of raw message files in a local mail directory.
pub const MAIL_FILE_EXTENSION: &str = "mime";

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("Failed to read mail directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A raw message loaded from disk.
#[derive(Debug, Clone)]
pub struct MailFile {
    pub path: PathBuf,
    pub raw: Vec<u8>,
}

/// Loads every `*.mime` file directly inside `dir`, ordered by file name.
///
/// Subdirectories are ignored. Files that cannot be read are logged and
/// skipped so one bad file does not hide the rest.
pub fn load_dir(dir: &Path) -> Result<Vec<MailFile>, MailboxError> {
    let entries = std::fs::read_dir(dir).map_err(|source| MailboxError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                None
            }
        })
        .filter(|path| path.is_file() && is_mail_file(path))
        .collect();
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read(&path) {
            Ok(raw) => files.push(MailFile { path, raw }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read mail file, skipping");
            }
        }
    }

    tracing::debug!(dir = %dir.display(), count = files.len(), "Loaded mail files");
    Ok(files)
}

/// Loads a single message file.
pub fn load_file(path: &Path) -> std::io::Result<MailFile> {
    Ok(MailFile {
        path: path.to_path_buf(),
        raw: std::fs::read(path)?,
    })
}

fn is_mail_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == MAIL_FILE_EXTENSION)
}
