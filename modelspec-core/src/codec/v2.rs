//! Generation 2 (`format_version: 0.2.0` or `0.2.0-csbdeep`).
//!
//! Citations become a list, nodes carry explicit pre/post-processing and the
//! `prediction` block is gone. Weights are still one implied saved-model
//! bundle and the training setup still lives at the top level.

use super::common::{self, Dialect};
use super::fields::{Emitter, Fields};
use super::{CodecOptions, SchemaCodec, ensure_decodable, ensure_encodable, version};
use crate::document::Document;
use crate::error::CodecError;
use crate::model::ModelDescriptor;

const VERSIONS: [&str; 2] = ["0.2.0", "0.2.0-csbdeep"];

#[derive(Debug, Clone, Default)]
pub struct V2Codec {
    options: CodecOptions,
}

impl V2Codec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl SchemaCodec for V2Codec {
    fn generation(&self) -> u32 {
        2
    }

    fn canonical_version(&self) -> &'static str {
        VERSIONS[0]
    }

    fn accepts_version(&self, version: &str) -> bool {
        version::is_exact(version, &VERSIONS)
    }

    fn decode(&self, doc: &Document) -> Result<ModelDescriptor, CodecError> {
        ensure_decodable(self, doc)?;
        let root = Fields::root(doc);
        let mut d = ModelDescriptor::with_format_version(root.required_string("format_version")?);

        d.set_name(root.string("name")?);
        d.set_description(root.string("description")?);
        d.set_timestamp(root.string("timestamp")?);
        d.set_authors(common::decode_authors(root, "authors")?);
        d.set_citations(common::decode_citation_list(root, "cite")?);
        d.set_documentation(root.string("documentation")?);
        d.set_tags(root.string_list("tags")?);
        d.set_license(root.string("license")?);
        d.set_source(root.string("source")?);
        d.set_execution_model(root.string("execution_model")?);
        d.set_git_repo(root.string("git_repo")?);
        d.set_test_inputs(root.string_or_list("test_inputs")?);
        d.set_test_outputs(root.string_or_list("test_outputs")?);
        d.set_sample_inputs(root.string_or_list("sample_inputs")?);
        d.set_sample_outputs(root.string_or_list("sample_outputs")?);
        common::absorb_legacy_fields(root, &mut d, &self.options.legacy_namespace, true)?;

        common::decode_nodes(root, &mut d, Dialect::V2)?;
        d.add_weights(common::decode_implied_weights(root)?);
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
            .put_opt("cite", common::encode_citation_list(d.citations(), false))
            .put_str("documentation", d.documentation())
            .put_opt("tags", common::encode_str_list(d.tags()))
            .put_str("license", d.license())
            .put_opt("language", common::legacy_string(d, ns, "language"))
            .put_opt("framework", common::legacy_string(d, ns, "framework"))
            .put_str("source", d.source())
            .put_str("execution_model", d.execution_model())
            .put_str("git_repo", d.git_repo())
            .put_opt("test_inputs", common::encode_str_list(d.test_inputs()))
            .put_opt("test_outputs", common::encode_str_list(d.test_outputs()))
            .put_opt("sample_inputs", common::encode_str_list(d.sample_inputs()))
            .put_opt("sample_outputs", common::encode_str_list(d.sample_outputs()));
        common::encode_nodes(d, &mut out, Dialect::V2);
        out.put_opt("training", common::legacy_mapping(d, ns, "training"))
            .put_opt("weights", common::encode_implied_weights(d));
        Ok(out.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_str;
    use crate::model::{NodeSpecification, WeightsFormat};
    use crate::transformation::{Mode, Transformation};
    use serde_yaml::Value;

    const SAMPLE: &str = r#"
format_version: 0.2.0-csbdeep
name: modelname
description: model description
authors: [authors]
cite:
  - text: my citation
    doi: https://arxiv.org/abs/2005.02987
documentation: model documentation
tags: [denoising, unet2d]
license: bsd
language: java
framework: tensorflow
source: denoiseg
execution_model: denoiseg
sample_inputs: [testinput.tif]
sample_outputs: [testoutput.tif]
inputs:
  - name: input
    axes: byxc
    data_type: float32
    data_range: [-inf, inf]
    shape:
      min: [1, 16, 16, 1]
      step: [1, 16, 16, 0]
    halo: [0, 96, 96, 0]
    preprocessing:
      - name: zero_mean_unit_variance
        kwargs:
          mode: fixed
          mean: 23.041513
          std: [38.51743]
outputs:
  - name: activation_19/Identity
    axes: byxc
    data_type: float32
    shape:
      reference_input: input
      scale: [1, 1, 2, 1]
      offset: [0, 0, 0, 3]
training:
  source: denoiseg.train()
  kwargs:
    batchSize: 128
"#;

    #[test]
    fn test_accepts_both_spellings() {
        let codec = V2Codec::default();
        assert!(codec.accepts_version("0.2.0"));
        assert!(codec.accepts_version("0.2.0-csbdeep"));
        assert!(!codec.accepts_version("0.2.1"));
        assert_eq!(codec.canonical_version(), "0.2.0");
    }

    #[test]
    fn test_decode_sample() {
        let d = V2Codec::default()
            .decode(&parse_str(SAMPLE).unwrap())
            .unwrap();
        assert_eq!(d.format_version(), "0.2.0-csbdeep");
        assert_eq!(d.authors().unwrap()[0].name, "authors");
        assert_eq!(d.tags().unwrap(), ["denoising", "unet2d"]);
        assert_eq!(d.execution_model(), Some("denoiseg"));
        assert_eq!(d.sample_inputs().unwrap(), ["testinput.tif"]);

        let input = &d.inputs().unwrap()[0];
        assert_eq!(input.halo(), Some(&[0, 96, 96, 0][..]));
        assert_eq!(input.shape_step(), Some(&[1, 16, 16, 0][..]));
        match &input.preprocessing().unwrap()[0] {
            Transformation::ZeroMeanUnitVariance(z) => {
                assert_eq!(z.mean, Some(23.041513));
                assert_eq!(z.std, Some(38.51743));
                assert_eq!(z.mode, Some(Mode::Fixed));
            }
            other => panic!("unexpected {:?}", other),
        }

        let output = &d.outputs().unwrap()[0];
        assert_eq!(output.name(), "activation_19/Identity");
        assert_eq!(output.shape_scale(), Some(&[1.0, 1.0, 2.0, 1.0][..]));
        assert_eq!(output.shape_offset(), Some(&[0.0, 0.0, 0.0, 3.0][..]));

        let batch = d
            .namespace("fiji")
            .and_then(|ns| ns.get("training"))
            .and_then(|t| t.get("kwargs"))
            .and_then(|k| k.get("batchSize"))
            .and_then(Value::as_i64);
        assert_eq!(batch, Some(128));

        let weights = d.weights().unwrap();
        assert_eq!(weights.len(), 1);
        let tf = d
            .weights_for(WeightsFormat::TensorflowSavedModelBundle)
            .unwrap();
        assert!(tf.sha256.is_none());
        assert!(tf.source.is_none());
    }

    #[test]
    fn test_single_string_sample_inputs() {
        let doc = parse_str("format_version: 0.2.0\nsample_inputs: in.tif\n").unwrap();
        let d = V2Codec::default().decode(&doc).unwrap();
        assert_eq!(d.sample_inputs().unwrap(), ["in.tif"]);
    }

    #[test]
    fn test_round_trip() {
        let codec = V2Codec::default();
        let d = codec.decode(&parse_str(SAMPLE).unwrap()).unwrap();
        let doc = codec.encode(&d).unwrap();
        assert!(doc.get("config").is_none());
        assert!(doc.get("training").is_some());
        assert_eq!(codec.decode(&doc).unwrap(), d);
    }
}
