//! Error types for the modelspec core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering codec dispatch, document parsing, archive access and configuration.
//! Decoding and encoding are fail-fast: any of these aborts the whole
//! operation and no partially built descriptor is returned.

use std::path::PathBuf;

/// Top-level error type for the modelspec core library.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpecError {
    /// True when no registered codec recognised the document's schema version.
    ///
    /// Best-effort multi-version readers use this to tell "not a descriptor
    /// we understand" apart from structural corruption.
    pub fn is_unrecognized_version(&self) -> bool {
        matches!(
            self,
            SpecError::Codec(CodecError::UnrecognizedSchemaVersion { .. })
        )
    }
}

/// Errors raised while mapping between documents and descriptors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("No matching schema version for format_version {}", display_version(.found))]
    UnrecognizedSchemaVersion { found: Option<String> },

    #[error("Unknown transformation kind '{kind}'")]
    UnknownTransformationKind { kind: String },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Duplicate node name: {name}")]
    DuplicateNodeName { name: String },

    #[error("Shape mismatch on node '{node}': {reason}")]
    ShapeMismatch { node: String, reason: String },

    #[error("No encoder registered for format_version '{version}'")]
    EncodeVersionMismatch { version: String },
}

impl CodecError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

fn display_version(found: &Option<String>) -> String {
    match found {
        Some(version) => format!("'{}'", version),
        None => "<absent>".to_string(),
    }
}

/// Errors from the generic document layer.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Malformed document: {message}")]
    Malformed { message: String },

    #[error("Failed to serialize document: {message}")]
    Serialize { message: String },
}

/// Errors from archive access.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Entry '{entry}' not found in archive {archive}")]
    EntryNotFound { archive: PathBuf, entry: String },

    #[error("Invalid archive {archive}: {message}")]
    Invalid { archive: PathBuf, message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// A type alias for results using the top-level `SpecError`.
pub type Result<T> = std::result::Result<T, SpecError>;
