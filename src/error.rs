use std::path::PathBuf;

/// Error taxonomy for the retrieval core.
///
/// Extraction failures are deliberately not a variant here: per the
/// pipeline's contract they are logged and skipped per-chunk rather than
/// surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum KbError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("source path does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("source path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("storage backend failure: {0}")]
    StorageError(#[from] anyhow::Error),

    #[error("model load failure: {0}")]
    ModelLoadError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KbError>;
