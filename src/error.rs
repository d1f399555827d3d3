use thiserror::Error;

/// Failure of a single storage strategy. Always absorbed at the gateway
/// boundary; callers of the gateway only ever see the aggregate outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// User-visible gallery failures, distinct from storage degradation.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}
