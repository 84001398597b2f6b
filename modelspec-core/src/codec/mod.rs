//! Schema codecs: one per document generation, plus the registry that picks
//! among them.
//!
//! A codec maps a [`Document`] to a [`ModelDescriptor`] and back for exactly
//! one generation. Codecs are immutable after construction and hold no I/O
//! handles, so a single registry can be shared across threads.

pub mod common;
pub mod fields;
pub mod registry;
pub mod transform;
pub mod v1;
pub mod v2;
pub mod v3;
pub mod v4;
pub mod version;

use crate::document::Document;
use crate::error::CodecError;
use crate::model::ModelDescriptor;

pub use registry::CodecRegistry;
pub use v1::V1Codec;
pub use v2::V2Codec;
pub use v3::V3Codec;
pub use v4::V4Codec;

/// Tool namespace under `config` that receives fields older generations kept
/// at the top level.
pub const DEFAULT_LEGACY_NAMESPACE: &str = "fiji";

/// Construction-time settings shared by the built-in codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    pub legacy_namespace: String,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            legacy_namespace: DEFAULT_LEGACY_NAMESPACE.to_string(),
        }
    }
}

/// Bidirectional mapping between descriptors and one document generation.
pub trait SchemaCodec: Send + Sync {
    /// Ordinal of the generation, starting at 1.
    fn generation(&self) -> u32;

    /// Version stamped on descriptors retargeted to this generation.
    fn canonical_version(&self) -> &'static str;

    /// Whether `version` names this generation.
    fn accepts_version(&self, version: &str) -> bool;

    fn can_decode(&self, doc: &Document) -> bool {
        version::format_version_of(doc).is_some_and(|v| self.accepts_version(&v))
    }

    fn decode(&self, doc: &Document) -> Result<ModelDescriptor, CodecError>;

    fn can_encode(&self, descriptor: &ModelDescriptor) -> bool {
        self.accepts_version(descriptor.format_version())
    }

    fn encode(&self, descriptor: &ModelDescriptor) -> Result<Document, CodecError>;
}

/// Reject a descriptor the codec was not built for.
pub(crate) fn ensure_encodable(
    codec: &dyn SchemaCodec,
    descriptor: &ModelDescriptor,
) -> Result<(), CodecError> {
    if codec.can_encode(descriptor) {
        Ok(())
    } else {
        Err(CodecError::EncodeVersionMismatch {
            version: descriptor.format_version().to_string(),
        })
    }
}

/// Reject a document the codec does not claim.
pub(crate) fn ensure_decodable(codec: &dyn SchemaCodec, doc: &Document) -> Result<(), CodecError> {
    if codec.can_decode(doc) {
        Ok(())
    } else {
        Err(CodecError::UnrecognizedSchemaVersion {
            found: version::format_version_of(doc),
        })
    }
}
