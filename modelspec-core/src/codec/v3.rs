//! Generation 3 (`format_version: 0.3.*`).
//!
//! Adds provenance (`sha256`, `parent`, `packaged_by`), attachments, a
//! free-form `config` and weights keyed by format. `language` and
//! `framework` are still written at the top level; in memory they live in
//! the legacy tool namespace of `config`.

use super::common::{self, Dialect};
use super::fields::{Emitter, Fields};
use super::{CodecOptions, SchemaCodec, ensure_decodable, ensure_encodable, version};
use crate::document::Document;
use crate::error::CodecError;
use crate::model::ModelDescriptor;
use serde_yaml::Value;

const VERSION: &str = "0.3.6";

/// Placeholder some exporters wrote instead of a source locator.
pub(crate) const TRAINING_SOURCE_PLACEHOLDER: &str = "n2v";

#[derive(Debug, Clone, Default)]
pub struct V3Codec {
    options: CodecOptions,
}

impl V3Codec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

/// Fields shared verbatim by generations 3 and 4.
pub(crate) fn decode_common(
    root: Fields<'_>,
    d: &mut ModelDescriptor,
    dialect: Dialect,
) -> Result<(), CodecError> {
    d.set_name(root.string("name")?);
    d.set_description(root.string("description")?);
    d.set_version(root.string("version")?);
    d.set_model_type(root.string("type")?);
    d.set_timestamp(root.string("timestamp")?);
    d.set_citations(common::decode_citation_list(root, "cite")?);
    d.set_authors(common::decode_authors(root, "authors")?);
    d.set_attachments(root.string_map("attachments")?);
    d.set_documentation(root.string("documentation")?);
    d.set_tags(root.string_list("tags")?);
    d.set_license(root.string("license")?);
    d.set_execution_model(root.string("execution_model")?);
    let source = root.string("source")?;
    d.set_source(match dialect {
        Dialect::V3 => source.filter(|s| s != TRAINING_SOURCE_PLACEHOLDER),
        _ => source,
    });
    d.set_hash(root.string("sha256")?);
    d.set_git_repo(root.string("git_repo")?);
    d.set_test_inputs(root.string_list("test_inputs")?);
    d.set_test_outputs(root.string_list("test_outputs")?);
    d.set_sample_inputs(root.string_list("sample_inputs")?);
    d.set_sample_outputs(root.string_list("sample_outputs")?);
    d.set_covers(root.string_list("covers")?);
    d.set_packaged_by(root.string("packaged_by")?);
    d.set_dependencies(root.string("dependencies")?);
    d.set_parent(common::decode_parent(root)?);
    d.set_config(root.mapping("config")?.cloned());

    common::decode_nodes(root, d, dialect)?;
    d.set_weights(common::decode_weights_map(root, dialect)?);
    Ok(())
}

impl SchemaCodec for V3Codec {
    fn generation(&self) -> u32 {
        3
    }

    fn canonical_version(&self) -> &'static str {
        VERSION
    }

    fn accepts_version(&self, version: &str) -> bool {
        version::in_series(version, 0, 3)
    }

    fn decode(&self, doc: &Document) -> Result<ModelDescriptor, CodecError> {
        ensure_decodable(self, doc)?;
        let root = Fields::root(doc);
        let mut d = ModelDescriptor::with_format_version(root.required_string("format_version")?);
        decode_common(root, &mut d, Dialect::V3)?;
        common::absorb_legacy_fields(root, &mut d, &self.options.legacy_namespace, false)?;
        Ok(d)
    }

    fn encode(&self, d: &ModelDescriptor) -> Result<Document, CodecError> {
        ensure_encodable(self, d)?;
        let ns = self.options.legacy_namespace.as_str();
        let mut out = Emitter::new();
        out.put("format_version", d.format_version())
            .put_str("name", d.name())
            .put_str("timestamp", d.timestamp())
            .put_str("description", d.description())
            .put_opt("authors", common::encode_authors(d.authors(), false))
            .put_opt("cite", common::encode_citation_list(d.citations(), true))
            .put_str("documentation", d.documentation())
            .put_opt("tags", common::encode_str_list(d.tags()))
            .put_str("license", d.license())
            .put_opt("language", common::legacy_string(d, ns, "language"))
            .put_opt("framework", common::legacy_string(d, ns, "framework"))
            .put_str("source", d.source())
            .put_str("execution_model", d.execution_model())
            .put_str("git_repo", d.git_repo())
            .put_string_map("attachments", d.attachments())
            .put_opt("test_inputs", common::encode_str_list(d.test_inputs()))
            .put_opt("test_outputs", common::encode_str_list(d.test_outputs()))
            .put_opt("sample_inputs", common::encode_str_list(d.sample_inputs()))
            .put_opt("sample_outputs", common::encode_str_list(d.sample_outputs()))
            .put_str("packaged_by", d.packaged_by())
            .put_str("dependencies", d.dependencies())
            .put_opt("covers", common::encode_str_list(d.covers()))
            .put_str("sha256", d.hash())
            .put_opt("parent", common::encode_parent(d.parent()))
            .put_str("version", d.version())
            .put_str("type", d.model_type());
        common::encode_nodes(d, &mut out, Dialect::V3);
        out.put_opt("weights", common::encode_weights_map(d, Dialect::V3))
            .put_opt("config", d.config().cloned().map(Value::Mapping));
        Ok(out.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_str;
    use crate::model::{Author, Citation, ParentRef, WeightsFormat};
    use crate::transformation::{Mode, Transformation, TransformationKind};

    const SAMPLE: &str = r#"
format_version: 0.3.2
name: UNet 2D Nuclei Broad
timestamp: 2019-12-11T12:22:32Z
description: A 2d U-Net trained on the nuclei broad dataset.
authors:
  - name: Jane Doe
    affiliation: EMBL
    orcid: 0000-0001-2345-6789
  - Joe Bloggs
cite:
  - text: Ronneberger et al. U-Net
    doi: https://doi.org/10.1007/978-3-319-24574-4_28
    url: https://arxiv.org/abs/1505.04597
documentation: README.md
tags: [unet2d, segmentation]
license: MIT
language: python
framework: pytorch
source: n2v
git_repo: https://github.com/example/unet
attachments:
  manifest: ./manifest.yaml
  training_log: ./log.txt
test_inputs: [test_input.npy]
test_outputs: [test_output.npy]
sample_inputs: [sample_input.tif]
covers: [cover.png]
packaged_by: tool-x
dependencies: conda:./environment.yaml
sha256: abc123
parent:
  uri: https://example.org/parent.yaml
  sha256: def456
version: 1.2.0
type: model
inputs:
  - name: raw
    description: raw input
    axes: bcyx
    data_type: float32
    data_range: [-inf, inf]
    shape:
      min: [1, 1, 32, 32]
      step: [0, 0, 16, 16]
    preprocessing:
      - name: scale_min_max
        kwargs: {mode: per_sample, reference_input: raw, min_percentile: 1, max_percentile: [99.8]}
      - name: clip
        kwargs: {min: 0, max: 1}
outputs:
  - name: probability
    axes: bcyx
    data_type: float32
    data_range: [0, 1]
    halo: [0, 0, 8, 8]
    shape:
      reference_input: raw
      scale: [1, 1, 1, 1]
      offset: [0, 0, 0, 0]
    postprocessing:
      - name: binarize
        kwargs: {threshold: 0.5}
weights:
  tensorflow_saved_model_bundle:
    source: ./weights.zip
    sha256: cafe0123
    tag: serve
    tensorflow_version: "1.15"
  pytorch_script:
    source: ./weights.pt
  caffe_model:
    source: ./weights.caffemodel
config:
  fiji:
    training: {batchSize: 4}
  other_tool: {k: v}
"#;

    fn sample() -> ModelDescriptor {
        V3Codec::default()
            .decode(&parse_str(SAMPLE).unwrap())
            .unwrap()
    }

    #[test]
    fn test_accepts_series() {
        let codec = V3Codec::default();
        assert!(codec.accepts_version("0.3.0"));
        assert!(codec.accepts_version("0.3.6"));
        assert!(!codec.accepts_version("0.4.0"));
        assert!(!codec.accepts_version("0.2.0"));
    }

    #[test]
    fn test_decode_metadata() {
        let d = sample();
        assert_eq!(d.format_version(), "0.3.2");
        assert_eq!(d.name(), Some("UNet 2D Nuclei Broad"));
        assert_eq!(d.timestamp(), Some("2019-12-11T12:22:32Z"));
        assert_eq!(d.version(), Some("1.2.0"));
        assert_eq!(d.model_type(), Some("model"));
        assert_eq!(d.hash(), Some("abc123"));
        assert_eq!(d.packaged_by(), Some("tool-x"));
        assert_eq!(d.dependencies(), Some("conda:./environment.yaml"));
        assert_eq!(d.covers().unwrap(), ["cover.png"]);
        assert_eq!(
            d.attachments().and_then(|a| a.get("manifest")).map(String::as_str),
            Some("./manifest.yaml")
        );
        assert_eq!(
            d.parent(),
            Some(&ParentRef {
                uri: Some("https://example.org/parent.yaml".into()),
                hash: Some("def456".into()),
            })
        );
        assert_eq!(
            d.authors().unwrap(),
            [
                Author::new("Jane Doe")
                    .with_affiliation("EMBL")
                    .with_orcid("0000-0001-2345-6789"),
                Author::new("Joe Bloggs"),
            ]
        );
        assert_eq!(
            d.citations().unwrap(),
            [Citation::new("Ronneberger et al. U-Net")
                .with_doi("https://doi.org/10.1007/978-3-319-24574-4_28")
                .with_url("https://arxiv.org/abs/1505.04597")]
        );
    }

    #[test]
    fn test_placeholder_source_is_absent() {
        assert_eq!(sample().source(), None);

        let doc = parse_str("format_version: 0.3.0\nsource: ./unet.py\n").unwrap();
        let d = V3Codec::default().decode(&doc).unwrap();
        assert_eq!(d.source(), Some("./unet.py"));
    }

    #[test]
    fn test_language_and_framework_move_into_config() {
        let d = sample();
        let fiji = d.namespace("fiji").unwrap();
        assert_eq!(fiji.get("language").and_then(Value::as_str), Some("python"));
        assert_eq!(fiji.get("framework").and_then(Value::as_str), Some("pytorch"));
        // the rest of the document's config is kept as written
        assert!(fiji.get("training").is_some());
        assert!(d.namespace("other_tool").is_some());
    }

    #[test]
    fn test_non_string_legacy_values_stay_in_config() {
        let codec = V3Codec::default();
        let doc = parse_str(
            "format_version: 0.3.6\nconfig:\n  fiji:\n    language: [a, b]\n    framework: 3\n",
        )
        .unwrap();
        let d = codec.decode(&doc).unwrap();

        let encoded = codec.encode(&d).unwrap();
        assert!(encoded.get("language").is_none());
        assert!(encoded.get("framework").is_none());
        assert_eq!(codec.decode(&encoded).unwrap(), d);
    }

    #[test]
    fn test_nodes_and_transformations() {
        let d = sample();
        let raw = d.input("raw").unwrap();
        assert_eq!(raw.spec.description.as_deref(), Some("raw input"));
        let kinds: Vec<_> = raw.preprocessing().unwrap().iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, [TransformationKind::ScaleMinMax, TransformationKind::Clip]);
        match &raw.preprocessing().unwrap()[0] {
            Transformation::ScaleMinMax(s) => {
                assert_eq!(s.reference_input.as_deref(), Some("raw"));
                assert_eq!(s.max_percentile, Some(99.8));
                assert_eq!(s.mode, Some(Mode::PerSample));
            }
            other => panic!("unexpected {:?}", other),
        }
        let out = d.output("probability").unwrap();
        assert_eq!(out.spec.halo.as_deref(), Some(&[0, 0, 8, 8][..]));
        assert_eq!(out.postprocessing().unwrap()[0].mode(), None);
    }

    #[test]
    fn test_weights_keyed_by_format() {
        let d = sample();
        let weights = d.weights().unwrap();
        assert_eq!(weights.len(), 2);
        let tf = d.weights_by_key("tensorflow_saved_model_bundle").unwrap();
        assert_eq!(tf.source.as_deref(), Some("./weights.zip"));
        assert_eq!(tf.sha256.as_deref(), Some("cafe0123"));
        assert_eq!(tf.tag(), Some("serve"));
        let ts = d.weights_for(WeightsFormat::Torchscript).unwrap();
        assert_eq!(ts.source.as_deref(), Some("./weights.pt"));
    }

    #[test]
    fn test_round_trip() {
        let codec = V3Codec::default();
        let d = sample();
        let doc = codec.encode(&d).unwrap();
        assert_eq!(doc.get("language").and_then(Value::as_str), Some("python"));
        assert!(doc.get("source").is_none());
        let weights = doc.get("weights").and_then(Value::as_mapping).unwrap();
        assert!(weights.get("pytorch_script").is_some());
        assert!(weights.get("caffe_model").is_none());
        assert_eq!(codec.decode(&doc).unwrap(), d);
    }

    #[test]
    fn test_round_trip_through_text() {
        let codec = V3Codec::default();
        let d = sample();
        let text = crate::document::to_yaml_string(&codec.encode(&d).unwrap()).unwrap();
        let again = codec.decode(&parse_str(&text).unwrap()).unwrap();
        assert_eq!(again, d);
    }

    #[test]
    fn test_attachments_must_be_strings() {
        let doc = parse_str("format_version: 0.3.0\nattachments:\n  files: [a.h5]\n").unwrap();
        let err = V3Codec::default().decode(&doc).unwrap_err();
        assert_eq!(
            err,
            CodecError::invalid("attachments.files", "expected a string, found a list")
        );
    }

    #[test]
    fn test_wrong_typed_field_names_path() {
        let doc = parse_str("format_version: 0.3.0\ntags: unet\n").unwrap();
        let err = V3Codec::default().decode(&doc).unwrap_err();
        assert!(matches!(err, CodecError::InvalidField { ref field, .. } if field == "tags"));
    }
}
