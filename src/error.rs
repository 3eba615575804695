// vidgallery Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A single classifier tier could not produce a result.
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl GalleryError {
    /// Wrap a message as an IO failure (used when a compensated step fails).
    pub fn io_failure(msg: impl Into<String>) -> Self {
        GalleryError::Io(std::io::Error::new(std::io::ErrorKind::Other, msg.into()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GalleryError::NotFound(_))
    }
}

impl From<anyhow::Error> for GalleryError {
    fn from(err: anyhow::Error) -> Self {
        GalleryError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
