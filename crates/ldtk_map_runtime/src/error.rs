use ldtk_map_schema::SchemaError;
use thiserror::Error;

/// Errors raised by an [`crate::AssetSource`]
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{path} not found")]
    NotFound { path: String },
    #[error("failed to read {path}: {error}")]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to decode image {path}: {error}")]
    Image {
        path: String,
        #[source]
        error: image::ImageError,
    },
}

impl SourceError {
    /// Map an I/O error, keeping not-found distinct
    pub fn io(path: &str, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound {
                path: path.to_string(),
            }
        } else {
            SourceError::Io {
                path: path.to_string(),
                error,
            }
        }
    }
}

/// Errors that fail a project load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("failed to load asset {key}: {source}")]
    MissingAsset {
        key: String,
        #[source]
        source: SourceError,
    },
    #[error("project is not loaded")]
    NotLoaded,
}

impl LoadError {
    pub fn missing(key: impl Into<String>, source: SourceError) -> Self {
        LoadError::MissingAsset {
            key: key.into(),
            source,
        }
    }

    /// Path of the document or asset that failed, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            LoadError::Schema(error) => Some(error.source_path()),
            LoadError::MissingAsset { key, .. } => Some(key),
            LoadError::NotLoaded => None,
        }
    }
}

/// Errors reading [`crate::ProjectOptions`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse options: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid path map pattern {pattern:?}: {error}")]
    InvalidPattern {
        pattern: String,
        #[source]
        error: regex::Error,
    },
    #[error("path map entry {index} needs exactly one of `path` or `pattern`")]
    InvalidEntry { index: usize },
}
