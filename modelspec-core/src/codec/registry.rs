//! Codec registry: ordered dispatch over the known generations.
//!
//! Reading tries each registered codec in order and the first whose
//! predicate accepts the document wins. Writing picks the codec whose
//! predicate accepts the descriptor's `format_version`. Adding a generation
//! means registering one more codec; existing entries are untouched.

use std::sync::Arc;
use tracing::debug;

use super::{CodecOptions, SchemaCodec, V1Codec, V2Codec, V3Codec, V4Codec, version};
use crate::document::Document;
use crate::error::CodecError;
use crate::model::ModelDescriptor;

/// One registered generation, as listed by [`CodecRegistry::generations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInfo {
    pub generation: u32,
    pub canonical_version: &'static str,
}

/// Ordered collection of codecs.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn SchemaCodec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("generations", &self.generations())
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_options(CodecOptions::default())
    }
}

impl CodecRegistry {
    /// A registry with no codecs.
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// The built-in generations, newest first.
    pub fn with_options(options: CodecOptions) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(V4Codec));
        registry.register(Arc::new(V3Codec::new(options.clone())));
        registry.register(Arc::new(V2Codec::new(options.clone())));
        registry.register(Arc::new(V1Codec::new(options)));
        registry
    }

    /// Append a codec after the existing ones.
    pub fn register(&mut self, codec: Arc<dyn SchemaCodec>) {
        debug!(
            generation = codec.generation(),
            version = codec.canonical_version(),
            "registered codec"
        );
        self.codecs.push(codec);
    }

    /// Registered codecs in lookup order.
    pub fn codecs(&self) -> impl Iterator<Item = &dyn SchemaCodec> {
        self.codecs.iter().map(|c| c.as_ref())
    }

    pub fn generations(&self) -> Vec<GenerationInfo> {
        self.codecs
            .iter()
            .map(|c| GenerationInfo {
                generation: c.generation(),
                canonical_version: c.canonical_version(),
            })
            .collect()
    }

    /// The codec that would read `doc`, if any.
    pub fn codec_for_document(&self, doc: &Document) -> Option<&Arc<dyn SchemaCodec>> {
        self.codecs.iter().find(|c| c.can_decode(doc))
    }

    /// The codec that would write a descriptor stamped with `version`.
    pub fn codec_for_version(&self, version: &str) -> Option<&Arc<dyn SchemaCodec>> {
        self.codecs.iter().find(|c| c.accepts_version(version))
    }

    /// Decode a document of any registered generation.
    pub fn decode_any(&self, doc: &Document) -> Result<ModelDescriptor, CodecError> {
        let codec = self.codec_for_document(doc).ok_or_else(|| {
            CodecError::UnrecognizedSchemaVersion {
                found: version::format_version_of(doc),
            }
        })?;
        debug!(generation = codec.generation(), "decoding document");
        codec.decode(doc)
    }

    /// Encode with the codec matching the descriptor's `format_version`.
    pub fn encode_for(&self, descriptor: &ModelDescriptor) -> Result<Document, CodecError> {
        let codec = self
            .codecs
            .iter()
            .find(|c| c.can_encode(descriptor))
            .ok_or_else(|| CodecError::EncodeVersionMismatch {
                version: descriptor.format_version().to_string(),
            })?;
        debug!(
            generation = codec.generation(),
            version = descriptor.format_version(),
            "encoding descriptor"
        );
        codec.encode(descriptor)
    }

    /// Stamp `version` on the descriptor, then encode it.
    ///
    /// Fields the target generation cannot represent are dropped from the
    /// output; the descriptor itself keeps them.
    pub fn encode_as(
        &self,
        descriptor: &mut ModelDescriptor,
        version: &str,
    ) -> Result<Document, CodecError> {
        if self.codec_for_version(version).is_none() {
            return Err(CodecError::EncodeVersionMismatch {
                version: version.to_string(),
            });
        }
        descriptor.set_format_version(version);
        self.encode_for(descriptor)
    }

    /// Retarget the descriptor to the newest generation and encode it.
    pub fn encode_latest(&self, descriptor: &mut ModelDescriptor) -> Result<Document, CodecError> {
        descriptor.update_to_newest_version();
        self.encode_for(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_str;
    use crate::model::NEWEST_FORMAT_VERSION;

    #[test]
    fn test_default_order_is_newest_first() {
        let gens: Vec<u32> = CodecRegistry::default()
            .generations()
            .iter()
            .map(|g| g.generation)
            .collect();
        assert_eq!(gens, [4, 3, 2, 1]);
    }

    #[test]
    fn test_decode_any_dispatches_by_version() {
        let registry = CodecRegistry::default();
        for (version, generation) in [
            ("0.1.0", 1),
            ("0.2.0-csbdeep", 2),
            ("0.3.2", 3),
            ("0.4.0", 4),
        ] {
            let doc = parse_str(&format!("format_version: {}\n", version)).unwrap();
            assert_eq!(
                registry.codec_for_document(&doc).map(|c| c.generation()),
                Some(generation)
            );
            assert_eq!(registry.decode_any(&doc).unwrap().format_version(), version);
        }
    }

    #[test]
    fn test_decode_any_unrecognized() {
        let registry = CodecRegistry::default();
        let doc = parse_str("format_version: 9.9.9\n").unwrap();
        assert_eq!(
            registry.decode_any(&doc).unwrap_err(),
            CodecError::UnrecognizedSchemaVersion {
                found: Some("9.9.9".into())
            }
        );
        let doc = parse_str("name: no version\n").unwrap();
        assert_eq!(
            registry.decode_any(&doc).unwrap_err(),
            CodecError::UnrecognizedSchemaVersion { found: None }
        );
    }

    #[test]
    fn test_empty_registry_recognizes_nothing() {
        let doc = parse_str("format_version: 0.4.0\n").unwrap();
        assert!(CodecRegistry::empty().decode_any(&doc).is_err());
    }

    #[test]
    fn test_encode_as_unknown_version_leaves_descriptor() {
        let registry = CodecRegistry::default();
        let mut d = ModelDescriptor::with_format_version("0.3.6");
        let err = registry.encode_as(&mut d, "7.0.0").unwrap_err();
        assert!(matches!(err, CodecError::EncodeVersionMismatch { .. }));
        assert_eq!(d.format_version(), "0.3.6");
    }

    #[test]
    fn test_encode_latest_stamps_newest() {
        let registry = CodecRegistry::default();
        let mut d = ModelDescriptor::with_format_version("0.1.0");
        let doc = registry.encode_latest(&mut d).unwrap();
        assert_eq!(d.format_version(), NEWEST_FORMAT_VERSION);
        assert_eq!(
            doc.get("format_version").and_then(serde_yaml::Value::as_str),
            Some(NEWEST_FORMAT_VERSION)
        );
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodecRegistry>();
    }
}
