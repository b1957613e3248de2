//! Document schema for LDtk project files
//!
//! This crate provides the serde types for `.ldtk` project documents and
//! `.ldtkl` external level documents, together with strict shape validation
//! that reports the JSON path of the first offending field.
//!
//! # Example
//!
//! ```rust,ignore
//! use ldtk_map_schema::parse_project;
//!
//! let bytes = std::fs::read("world.ldtk")?;
//! let project = parse_project("world.ldtk", &bytes, true)?;
//! println!("{} levels", project.levels.len());
//! ```

mod types;
mod validate;
mod version;

pub use types::*;
pub use validate::*;
pub use version::*;

use thiserror::Error;

/// Errors that can occur when parsing or validating documents
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{source_path}: failed to parse JSON: {error}")]
    Json {
        source_path: String,
        #[source]
        error: serde_json::Error,
    },
    #[error("{source_path}: invalid document at {path}: {message}")]
    Validation {
        source_path: String,
        path: String,
        message: String,
    },
}

impl SchemaError {
    pub(crate) fn invalid(path: &str, message: &str) -> Self {
        SchemaError::Validation {
            source_path: String::new(),
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Attach the path of the document that failed
    pub fn with_source(self, source: &str) -> Self {
        match self {
            SchemaError::Json { error, .. } => SchemaError::Json {
                source_path: source.to_string(),
                error,
            },
            SchemaError::Validation { path, message, .. } => SchemaError::Validation {
                source_path: source.to_string(),
                path,
                message,
            },
        }
    }

    /// Path of the document that failed
    pub fn source_path(&self) -> &str {
        match self {
            SchemaError::Json { source_path, .. } | SchemaError::Validation { source_path, .. } => {
                source_path
            }
        }
    }
}

/// Parse a project document
///
/// With `strict` set the raw JSON is validated with [`validate_project`]
/// first; otherwise only the minimal shape implied by the serde types is
/// assumed and missing fields take their defaults.
pub fn parse_project(
    source: &str,
    bytes: &[u8],
    strict: bool,
) -> Result<ProjectDocument, SchemaError> {
    let value = parse_json(source, bytes)?;
    if strict {
        validate_project(source, &value)?;
    }
    serde_json::from_value(value).map_err(|error| SchemaError::Json {
        source_path: source.to_string(),
        error,
    })
}

/// Parse an external level document
pub fn parse_level(source: &str, bytes: &[u8], strict: bool) -> Result<LevelDocument, SchemaError> {
    let value = parse_json(source, bytes)?;
    if strict {
        validate_level(source, &value)?;
    }
    serde_json::from_value(value).map_err(|error| SchemaError::Json {
        source_path: source.to_string(),
        error,
    })
}

fn parse_json(source: &str, bytes: &[u8]) -> Result<serde_json::Value, SchemaError> {
    serde_json::from_slice(bytes).map_err(|error| SchemaError::Json {
        source_path: source.to_string(),
        error,
    })
}
