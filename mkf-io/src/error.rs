use std::path::PathBuf;

use mkf_core::MkfError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Image error in {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid image {path}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Core(#[from] MkfError),
}

impl IoError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

impl From<IoError> for MkfError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Core(inner) => inner,
            other => MkfError::Io(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IoError>;
