//! Generation 1 (`format_version: 0.1.0`).
//!
//! The oldest layout. It has no explicit node transformations: a single
//! `prediction.preprocess.kwargs {mean, stdDev}` block stands for a fixed
//! normalization of the first input and its inverse on the first output.
//! Weights are implied to be one saved-model bundle.

use serde_yaml::Value;

use super::common::{self, Dialect};
use super::fields::{Emitter, Fields};
use super::{CodecOptions, SchemaCodec, ensure_decodable, ensure_encodable, version};
use crate::document::Document;
use crate::error::CodecError;
use crate::model::ModelDescriptor;
use crate::transformation::{Mode, Transformation};

const VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Default)]
pub struct V1Codec {
    options: CodecOptions,
}

impl V1Codec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    fn namespace(&self) -> &str {
        &self.options.legacy_namespace
    }
}

impl SchemaCodec for V1Codec {
    fn generation(&self) -> u32 {
        1
    }

    fn canonical_version(&self) -> &'static str {
        VERSION
    }

    fn accepts_version(&self, version: &str) -> bool {
        version::is_exact(version, &[VERSION])
    }

    fn decode(&self, doc: &Document) -> Result<ModelDescriptor, CodecError> {
        ensure_decodable(self, doc)?;
        let root = Fields::root(doc);
        let mut d = ModelDescriptor::with_format_version(root.required_string("format_version")?);

        d.set_name(root.string("name")?);
        d.set_description(root.string("description")?);
        d.set_authors(common::decode_authors(root, "authors")?);
        let cite_path = root.path_of("cite");
        if let Some(cite) = root.mapping("cite")? {
            d.set_citations(Some(vec![common::decode_citation(Fields::nested(
                cite, &cite_path,
            ))?]));
        }
        d.set_documentation(root.string("documentation")?);
        d.set_tags(root.string_list("tags")?);
        d.set_license(root.string("license")?);
        d.set_source(root.string("source")?);
        d.set_test_inputs(root.string("test_input")?.map(|s| vec![s]));
        d.set_test_outputs(root.string("test_output")?.map(|s| vec![s]));
        common::absorb_legacy_fields(root, &mut d, self.namespace(), true)?;

        common::decode_nodes(root, &mut d, Dialect::V1)?;
        apply_prediction(root, &mut d)?;

        d.add_weights(common::decode_implied_weights(root)?);
        Ok(d)
    }

    fn encode(&self, d: &ModelDescriptor) -> Result<Document, CodecError> {
        ensure_encodable(self, d)?;
        let ns = self.namespace();
        let mut out = Emitter::new();
        out.put("format_version", d.format_version())
            .put_str("name", d.name())
            .put_str("description", d.description())
            .put_opt("authors", common::encode_authors(d.authors(), false))
            .put_opt(
                "cite",
                d.citations()
                    .and_then(|c| c.first())
                    .map(|c| common::encode_citation(c, false)),
            )
            .put_str("documentation", d.documentation())
            .put_opt("tags", common::encode_str_list(d.tags()))
            .put_str("license", d.license())
            .put_opt("language", common::legacy_string(d, ns, "language"))
            .put_opt("framework", common::legacy_string(d, ns, "framework"))
            .put_str("source", d.source())
            .put_str(
                "test_input",
                d.test_inputs().and_then(|t| t.first()).map(String::as_str),
            )
            .put_str(
                "test_output",
                d.test_outputs().and_then(|t| t.first()).map(String::as_str),
            );
        common::encode_nodes(d, &mut out, Dialect::V1);
        out.put_opt("training", common::legacy_mapping(d, ns, "training"))
            .put_opt("prediction", prediction_block(d))
            .put_opt("weights", common::encode_implied_weights(d));
        Ok(out.finish())
    }
}

/// Turn `prediction.preprocess.kwargs {mean, stdDev}` into a fixed
/// normalization on the first input and the matching rescale on the first
/// output. Nothing happens unless both values are present.
fn apply_prediction(root: Fields<'_>, d: &mut ModelDescriptor) -> Result<(), CodecError> {
    let prediction_path = root.path_of("prediction");
    let Some(prediction) = root.mapping("prediction")? else {
        return Ok(());
    };
    let prediction = Fields::nested(prediction, &prediction_path);
    let preprocess_path = prediction.path_of("preprocess");
    let Some(preprocess) = prediction.mapping("preprocess")? else {
        return Ok(());
    };
    let preprocess = Fields::nested(preprocess, &preprocess_path);
    let kwargs_path = preprocess.path_of("kwargs");
    let Some(kwargs) = preprocess.mapping("kwargs")? else {
        return Ok(());
    };
    let kwargs = Fields::nested(kwargs, &kwargs_path);

    let (Some(mean), Some(std)) = (kwargs.number("mean")?, kwargs.number("stdDev")?) else {
        return Ok(());
    };
    if let Some(input) = d.inputs_mut().and_then(|nodes| nodes.first_mut()) {
        input.set_preprocessing(Some(vec![Transformation::zero_mean_unit_variance(
            mean, std,
        )]));
    }
    if let Some(output) = d.outputs_mut().and_then(|nodes| nodes.first_mut()) {
        output.set_postprocessing(Some(vec![Transformation::scale_linear(std, mean)]));
    }
    Ok(())
}

fn prediction_block(d: &ModelDescriptor) -> Option<Value> {
    let steps = d.inputs()?.first()?.preprocessing()?;
    let [Transformation::ZeroMeanUnitVariance(zmuv)] = steps else {
        return None;
    };
    // the legacy block can only express a fixed normalization over all axes
    if zmuv.mode != Some(Mode::Fixed) || zmuv.axes.is_some() {
        return None;
    }
    let mut kwargs = Emitter::new();
    kwargs
        .put_number("mean", Some(zmuv.mean?))
        .put_number("stdDev", Some(zmuv.std?));
    let mut preprocess = Emitter::new();
    preprocess.put_nested("kwargs", kwargs);
    let mut prediction = Emitter::new();
    prediction.put_nested("preprocess", preprocess);
    Some(Value::Mapping(prediction.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_str;
    use crate::model::{NodeSpecification, WeightsEntry, WeightsFormat};
    use crate::transformation::ZeroMeanUnitVariance;

    const SAMPLE: &str = r#"
format_version: 0.1.0
name: n2v
description: denoising
authors: Jane Doe
cite:
  text: my citation
  doi: https://arxiv.org/abs/2005.02987
language: java
framework: tensorflow
source: n2v
test_input: testinput.tif
test_output: testoutput.tif
inputs:
  - name: input
    axes: byxc
    data_type: float32
    data_range: [-inf, inf]
    shape:
      min: [1, 4, 4, 1]
      step: [1, 4, 4, 0]
outputs:
  - name: output
    axes: byxc
    data_type: float32
    shape:
      reference_input: input
      scale: [1, 1, 1, 1]
      offset: [0, 0, 0, 0]
training:
  source: n2v.train()
  kwargs: {batchSize: 128}
prediction:
  preprocess:
    kwargs: {mean: 100, stdDev: 10}
"#;

    #[test]
    fn test_accepts_exact_version_only() {
        let codec = V1Codec::default();
        assert!(codec.accepts_version("0.1.0"));
        assert!(!codec.accepts_version("0.1.1"));
        assert!(!codec.accepts_version("0.1"));
    }

    #[test]
    fn test_decode_synthesizes_transformations() {
        let d = V1Codec::default()
            .decode(&parse_str(SAMPLE).unwrap())
            .unwrap();
        let input = &d.inputs().unwrap()[0];
        let pre = input.preprocessing().unwrap();
        assert_eq!(pre, [Transformation::zero_mean_unit_variance(100.0, 10.0)]);
        assert_eq!(pre[0].mode(), Some(Mode::Fixed));

        let output = &d.outputs().unwrap()[0];
        assert_eq!(
            output.postprocessing().unwrap(),
            [Transformation::scale_linear(10.0, 100.0)]
        );
        assert_eq!(output.shape_reference_input(), Some("input"));
    }

    #[test]
    fn test_decode_legacy_fields() {
        let d = V1Codec::default()
            .decode(&parse_str(SAMPLE).unwrap())
            .unwrap();
        assert_eq!(d.authors().unwrap()[0].name, "Jane Doe");
        assert_eq!(d.citations().unwrap().len(), 1);
        assert_eq!(d.test_inputs().unwrap(), ["testinput.tif"]);
        assert_eq!(d.source(), Some("n2v"));
        let fiji = d.namespace("fiji").unwrap();
        assert_eq!(fiji.get("framework").and_then(Value::as_str), Some("tensorflow"));
        assert!(fiji.get("training").is_some());
    }

    #[test]
    fn test_default_weights() {
        let d = V1Codec::default()
            .decode(&parse_str(SAMPLE).unwrap())
            .unwrap();
        let weights = d.weights().unwrap();
        assert_eq!(weights.len(), 1);
        let entry = d
            .weights_for(WeightsFormat::TensorflowSavedModelBundle)
            .unwrap();
        assert_eq!(entry, &WeightsEntry::tensorflow_saved_model_bundle());
        assert!(entry.source.is_none());
        assert_eq!(entry.tag(), Some("serve"));
    }

    #[test]
    fn test_prediction_needs_both_values() {
        let doc = parse_str(
            "format_version: 0.1.0\ninputs: [{name: a}]\noutputs: [{name: b}]\nprediction:\n  preprocess:\n    kwargs: {mean: 1}\n",
        )
        .unwrap();
        let d = V1Codec::default().decode(&doc).unwrap();
        assert!(d.inputs().unwrap()[0].preprocessing().is_none());
        assert!(d.outputs().unwrap()[0].postprocessing().is_none());
    }

    #[test]
    fn test_encode_inverts_legacy_mapping() {
        let codec = V1Codec::default();
        let d = codec.decode(&parse_str(SAMPLE).unwrap()).unwrap();
        let doc = codec.encode(&d).unwrap();

        let kwargs = doc
            .get("prediction")
            .and_then(|p| p.get("preprocess"))
            .and_then(|p| p.get("kwargs"))
            .unwrap();
        assert_eq!(kwargs.get("mean").and_then(Value::as_f64), Some(100.0));
        assert_eq!(kwargs.get("stdDev").and_then(Value::as_f64), Some(10.0));
        assert_eq!(doc.get("language").and_then(Value::as_str), Some("java"));
        assert!(doc.get("cite").unwrap().is_mapping());
        assert!(doc.get("weights").is_none());
        assert!(doc.get("config").is_none());
        let input = doc.get("inputs").unwrap().as_sequence().unwrap()[0].clone();
        assert!(input.get("preprocessing").is_none());

        assert_eq!(codec.decode(&doc).unwrap(), d);
    }

    #[test]
    fn test_non_fixed_normalization_is_not_written_as_prediction() {
        let codec = V1Codec::default();
        let mut d = codec.decode(&parse_str(SAMPLE).unwrap()).unwrap();

        let mut per_sample = Transformation::zero_mean_unit_variance(100.0, 10.0);
        per_sample.set_mode(Some(Mode::PerSample));
        d.inputs_mut().unwrap()[0].set_preprocessing(Some(vec![per_sample]));
        assert!(codec.encode(&d).unwrap().get("prediction").is_none());

        let along_axes = Transformation::ZeroMeanUnitVariance(ZeroMeanUnitVariance {
            mean: Some(100.0),
            std: Some(10.0),
            mode: Some(Mode::Fixed),
            axes: Some("xy".into()),
        });
        d.inputs_mut().unwrap()[0].set_preprocessing(Some(vec![along_axes]));
        assert!(codec.encode(&d).unwrap().get("prediction").is_none());
    }

    #[test]
    fn test_encode_rejects_other_versions() {
        let d = ModelDescriptor::new();
        assert_eq!(
            V1Codec::default().encode(&d).unwrap_err(),
            CodecError::EncodeVersionMismatch {
                version: "0.4.0".into()
            }
        );
    }

    #[test]
    fn test_node_names_are_kept() {
        let d = V1Codec::default()
            .decode(&parse_str(SAMPLE).unwrap())
            .unwrap();
        assert_eq!(d.inputs().unwrap()[0].name(), "input");
        assert_eq!(d.outputs().unwrap()[0].name(), "output");
    }
}
