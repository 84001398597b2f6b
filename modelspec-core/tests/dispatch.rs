//! Version dispatch across the registered codecs.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use modelspec_core::codec::{CodecOptions, SchemaCodec};
use modelspec_core::document::{Document, parse_str};
use modelspec_core::{CodecError, CodecRegistry, GenerationInfo, ModelDescriptor};

const VERSIONS: &[&str] = &[
    "0.1.0",
    "0.1.1",
    "0.2.0",
    "0.2.0-csbdeep",
    "0.2.1",
    "0.3.0",
    "0.3.2",
    "0.3.6",
    "0.3.10-beta",
    "0.30.0",
    "0.4.0",
    "0.4.9",
    "0.5.0",
    "1.0.0",
    "",
    "latest",
];

#[test]
fn test_at_most_one_codec_accepts_each_version() {
    let registry = CodecRegistry::default();
    for version in VERSIONS {
        let accepting: Vec<u32> = registry
            .codecs()
            .filter(|c| c.accepts_version(version))
            .map(|c| c.generation())
            .collect();
        assert!(
            accepting.len() <= 1,
            "{:?} accepted by generations {:?}",
            version,
            accepting
        );
    }
}

#[test]
fn test_dispatch_table() {
    let registry = CodecRegistry::default();
    let expected = [
        ("0.1.0", Some(1)),
        ("0.1.1", None),
        ("0.2.0", Some(2)),
        ("0.2.0-csbdeep", Some(2)),
        ("0.2.1", None),
        ("0.3.0", Some(3)),
        ("0.3.10-beta", Some(3)),
        ("0.30.0", None),
        ("0.4.9", Some(4)),
        ("0.5.0", None),
    ];
    for (version, generation) in expected {
        assert_eq!(
            registry.codec_for_version(version).map(|c| c.generation()),
            generation,
            "version {}",
            version
        );
    }
}

#[test]
fn test_numeric_format_version_is_stringified() {
    let doc = parse_str("format_version: 0.1\n").unwrap();
    assert_eq!(
        CodecRegistry::default().decode_any(&doc).unwrap_err(),
        CodecError::UnrecognizedSchemaVersion {
            found: Some("0.1".into())
        }
    );
}

#[test]
fn test_encode_for_unknown_version() {
    let d = ModelDescriptor::with_format_version("0.9.0");
    assert_eq!(
        CodecRegistry::default().encode_for(&d).unwrap_err(),
        CodecError::EncodeVersionMismatch {
            version: "0.9.0".into()
        }
    );
}

#[test]
fn test_encode_as_stamps_requested_version() {
    let registry = CodecRegistry::default();
    let mut d = ModelDescriptor::new();
    d.set_name(Some("stamped".into()));
    let doc = registry.encode_as(&mut d, "0.2.0-csbdeep").unwrap();
    assert_eq!(d.format_version(), "0.2.0-csbdeep");
    assert_eq!(
        doc.get("format_version").and_then(serde_yaml::Value::as_str),
        Some("0.2.0-csbdeep")
    );
}

#[test]
fn test_generations_listing() {
    assert_eq!(
        CodecRegistry::default().generations(),
        vec![
            GenerationInfo {
                generation: 4,
                canonical_version: "0.4.0"
            },
            GenerationInfo {
                generation: 3,
                canonical_version: "0.3.6"
            },
            GenerationInfo {
                generation: 2,
                canonical_version: "0.2.0"
            },
            GenerationInfo {
                generation: 1,
                canonical_version: "0.1.0"
            },
        ]
    );
}

/// A made-up future generation that only records the name.
struct NameOnlyCodec;

impl SchemaCodec for NameOnlyCodec {
    fn generation(&self) -> u32 {
        5
    }

    fn canonical_version(&self) -> &'static str {
        "0.5.0"
    }

    fn accepts_version(&self, version: &str) -> bool {
        version.starts_with("0.5.")
    }

    fn decode(&self, doc: &Document) -> Result<ModelDescriptor, CodecError> {
        let mut d = ModelDescriptor::with_format_version("0.5.0");
        d.set_name(
            doc.get("name")
                .and_then(serde_yaml::Value::as_str)
                .map(str::to_string),
        );
        Ok(d)
    }

    fn encode(&self, d: &ModelDescriptor) -> Result<Document, CodecError> {
        let mut doc = Document::new();
        doc.insert("format_version".into(), d.format_version().into());
        if let Some(name) = d.name() {
            doc.insert("name".into(), name.into());
        }
        Ok(doc)
    }
}

#[test]
fn test_register_new_generation_leaves_others_untouched() {
    let mut registry = CodecRegistry::with_options(CodecOptions::default());
    registry.register(Arc::new(NameOnlyCodec));

    let doc = parse_str("format_version: 0.5.1\nname: future\n").unwrap();
    let d = registry.decode_any(&doc).unwrap();
    assert_eq!(d.name(), Some("future"));

    let old = parse_str("format_version: 0.3.6\nname: present\n").unwrap();
    assert_eq!(registry.decode_any(&old).unwrap().format_version(), "0.3.6");

    let mut d = ModelDescriptor::new();
    let doc = registry.encode_as(&mut d, "0.5.0").unwrap();
    assert_eq!(doc.len(), 1);
}

#[test]
fn test_custom_legacy_namespace() {
    let registry = CodecRegistry::with_options(CodecOptions {
        legacy_namespace: "imagej".into(),
    });
    let doc = parse_str("format_version: 0.3.6\nlanguage: java\n").unwrap();
    let d = registry.decode_any(&doc).unwrap();
    assert!(d.namespace("fiji").is_none());
    assert_eq!(
        d.namespace("imagej")
            .and_then(|ns| ns.get("language"))
            .and_then(serde_yaml::Value::as_str),
        Some("java")
    );
}

#[test]
fn test_shared_registry_across_threads() {
    let registry = Arc::new(CodecRegistry::default());
    let handles: Vec<_> = ["0.1.0", "0.2.0", "0.3.6", "0.4.0"]
        .into_iter()
        .map(|version| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let doc = parse_str(&format!("format_version: {}\nname: t\n", version)).unwrap();
                registry.decode_any(&doc).unwrap().format_version().to_string()
            })
        })
        .collect();
    let versions: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(versions, ["0.1.0", "0.2.0", "0.3.6", "0.4.0"]);
}
