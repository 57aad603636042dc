use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring the recipe collection into the store.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse the recipe collection: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("the recipe collection is not a JSON array")]
    NotAnArray,
    #[error("recipe index error: {0}")]
    Db(#[from] rusqlite::Error),
}
