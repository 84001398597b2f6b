//! Record layouts shared between generations.
//!
//! Each generation's codec composes these helpers; the small differences
//! between generations (key names, what a node carries) are selected by
//! [`Dialect`].

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::fields::{Emitter, Fields, str_seq};
use super::transform;
use crate::document::kind_of;
use crate::error::CodecError;
use crate::model::{
    Author, Citation, DEFAULT_SERVING_TAG, InputNode, ModelDescriptor, NodeSpec,
    NodeSpecification, OutputNode, ParentRef, WeightsEntry, WeightsFormat, WeightsVariant,
};

/// Per-generation wire conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    V1,
    V2,
    V3,
    V4,
}

impl Dialect {
    /// Key naming the reference tensor of an output shape or a ScaleMinMax step.
    pub fn reference_key(self) -> &'static str {
        match self {
            Dialect::V4 => "reference_tensor",
            _ => "reference_input",
        }
    }

    /// Whether nodes carry explicit pre/post-processing lists.
    pub fn has_node_transformations(self) -> bool {
        self != Dialect::V1
    }

    pub fn has_node_description(self) -> bool {
        matches!(self, Dialect::V3 | Dialect::V4)
    }

    pub fn weights_key(self, format: WeightsFormat) -> &'static str {
        match (self, format) {
            (Dialect::V4, _) => format.key(),
            (_, WeightsFormat::Torchscript) => "pytorch_script",
            (_, format) => format.key(),
        }
    }

    pub fn weights_format(self, key: &str) -> Option<WeightsFormat> {
        WeightsFormat::ALL
            .into_iter()
            .find(|format| self.weights_key(*format) == key)
    }
}

// --- Authors ---

/// Authors written as one string, a list of strings, or a list of mappings.
pub fn decode_authors(root: Fields<'_>, key: &str) -> Result<Option<Vec<Author>>, CodecError> {
    let items = match root.get(key) {
        None => return Ok(None),
        Some(Value::String(name)) => return Ok(Some(vec![Author::new(name.clone())])),
        Some(Value::Sequence(items)) => items,
        Some(other) => {
            return Err(CodecError::invalid(
                root.path_of(key).as_str(),
                format!("expected a list of authors, found {}", kind_of(other)),
            ));
        }
    };
    let mut authors = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = root.element_path(key, i);
        let author = match item {
            Value::String(name) => Author::new(name.clone()),
            Value::Mapping(map) => {
                let f = Fields::nested(map, &path);
                Author {
                    name: f.required_string("name")?,
                    affiliation: f.string("affiliation")?,
                    orcid: f.string("orcid")?,
                }
            }
            other => {
                return Err(CodecError::invalid(
                    path.as_str(),
                    format!("expected a string or a mapping, found {}", kind_of(other)),
                ));
            }
        };
        authors.push(author);
    }
    Ok(Some(authors))
}

/// Authors as plain names when none carries more than a name, unless
/// `always_mappings` is set.
pub fn encode_authors(authors: Option<&[Author]>, always_mappings: bool) -> Option<Value> {
    let authors = authors?;
    if !always_mappings && authors.iter().all(Author::is_name_only) {
        return Some(Value::Sequence(
            authors.iter().map(|a| Value::from(a.name.as_str())).collect(),
        ));
    }
    Some(Value::Sequence(
        authors
            .iter()
            .map(|a| {
                let mut out = Emitter::new();
                out.put("name", a.name.as_str())
                    .put_str("affiliation", a.affiliation.as_deref())
                    .put_str("orcid", a.orcid.as_deref());
                Value::Mapping(out.finish())
            })
            .collect(),
    ))
}

// --- Citations ---

pub fn decode_citation(f: Fields<'_>) -> Result<Citation, CodecError> {
    Ok(Citation {
        text: f.required_string("text")?,
        doi: f.string("doi")?,
        url: f.string("url")?,
    })
}

pub fn decode_citation_list(
    root: Fields<'_>,
    key: &str,
) -> Result<Option<Vec<Citation>>, CodecError> {
    let Some(items) = root.list(key)? else {
        return Ok(None);
    };
    let mut citations = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = root.element_path(key, i);
        let map = expect_mapping(item, path.as_str())?;
        citations.push(decode_citation(Fields::nested(map, &path))?);
    }
    Ok(Some(citations))
}

pub fn encode_citation(citation: &Citation, with_url: bool) -> Value {
    let mut out = Emitter::new();
    out.put("text", citation.text.as_str())
        .put_str("doi", citation.doi.as_deref());
    if with_url {
        out.put_str("url", citation.url.as_deref());
    }
    Value::Mapping(out.finish())
}

/// Citation list; an empty or absent list yields no value so no `cite` key
/// is written.
pub fn encode_citation_list(citations: Option<&[Citation]>, with_url: bool) -> Option<Value> {
    let citations = citations.filter(|c| !c.is_empty())?;
    Some(Value::Sequence(
        citations
            .iter()
            .map(|c| encode_citation(c, with_url))
            .collect(),
    ))
}

// --- Parent ---

pub fn decode_parent(root: Fields<'_>) -> Result<Option<ParentRef>, CodecError> {
    let path = root.path_of("parent");
    let Some(map) = root.mapping("parent")? else {
        return Ok(None);
    };
    let f = Fields::nested(map, &path);
    Ok(Some(ParentRef {
        uri: f.string("uri")?,
        hash: f.string("sha256")?,
    }))
}

pub fn encode_parent(parent: Option<&ParentRef>) -> Option<Value> {
    let parent = parent?;
    let mut out = Emitter::new();
    out.put_str("uri", parent.uri.as_deref())
        .put_str("sha256", parent.hash.as_deref());
    Some(Value::Mapping(out.finish()))
}

// --- Nodes ---

fn decode_node_spec(f: Fields<'_>, dialect: Dialect) -> Result<NodeSpec, CodecError> {
    let mut spec = NodeSpec::new(f.required_string("name")?);
    spec.axes = f.string("axes")?;
    spec.data_type = f.string("data_type")?;
    spec.data_range = f.data_range("data_range")?;
    spec.halo = f.int_list("halo")?;
    if dialect.has_node_description() {
        spec.description = f.string("description")?;
    }
    Ok(spec)
}

fn encode_node_spec(node: &impl NodeSpecification, dialect: Dialect) -> Emitter {
    let mut out = Emitter::new();
    out.put("name", node.name())
        .put_str("axes", node.axes())
        .put_str("data_type", node.data_type())
        .put_data_range("data_range", node.data_range())
        .put_int_list("halo", node.halo());
    if dialect.has_node_description() {
        out.put_str("description", node.description());
    }
    out
}

pub fn decode_input(f: Fields<'_>, dialect: Dialect) -> Result<InputNode, CodecError> {
    let mut node = InputNode::new("");
    node.spec = decode_node_spec(f, dialect)?;

    let shape_path = f.path_of("shape");
    match f.get("shape") {
        None => {}
        Some(Value::Mapping(map)) => {
            let shape = Fields::nested(map, &shape_path);
            match (shape.int_list("min")?, shape.int_list("step")?) {
                (Some(min), Some(step)) => node.set_shape(min, step)?,
                (Some(min), None) => node.set_shape_min(min)?,
                (None, Some(_)) => return Err(CodecError::missing(shape.path_of("min").as_str())),
                (None, None) => {}
            }
        }
        Some(Value::Sequence(_)) if dialect == Dialect::V4 => {
            if let Some(explicit) = f.int_list("shape")? {
                let step = vec![0; explicit.len()];
                node.set_shape(explicit, step)?;
            }
        }
        Some(other) => {
            return Err(CodecError::invalid(
                shape_path.as_str(),
                format!("expected a mapping, found {}", kind_of(other)),
            ));
        }
    }

    if dialect.has_node_transformations() {
        node.set_preprocessing(transform::decode_list(f, "preprocessing", dialect)?);
    }
    Ok(node)
}

pub fn encode_input(node: &InputNode, dialect: Dialect) -> Value {
    let mut out = encode_node_spec(node, dialect);
    let mut shape = Emitter::new();
    shape
        .put_int_list("min", node.shape_min())
        .put_int_list("step", node.shape_step());
    out.put_nested("shape", shape);
    if dialect.has_node_transformations() {
        out.put_opt(
            "preprocessing",
            transform::encode_list(node.preprocessing(), dialect),
        );
    }
    Value::Mapping(out.finish())
}

pub fn decode_output(f: Fields<'_>, dialect: Dialect) -> Result<OutputNode, CodecError> {
    let mut node = OutputNode::new("");
    node.spec = decode_node_spec(f, dialect)?;

    let shape_path = f.path_of("shape");
    match f.get("shape") {
        None => {}
        Some(Value::Mapping(map)) => {
            let shape = Fields::nested(map, &shape_path);
            node.set_shape_reference_input(shape.string(dialect.reference_key())?);
            node.set_shape(shape.float_list("scale")?, shape.float_list("offset")?)?;
        }
        Some(Value::Sequence(_)) if dialect == Dialect::V4 => {
            // Fixed output shapes have no counterpart in the entity model.
            tracing::debug!(node = %node.name(), "ignoring explicit output shape");
        }
        Some(other) => {
            return Err(CodecError::invalid(
                shape_path.as_str(),
                format!("expected a mapping, found {}", kind_of(other)),
            ));
        }
    }

    if dialect.has_node_transformations() {
        node.set_postprocessing(transform::decode_list(f, "postprocessing", dialect)?);
    }
    Ok(node)
}

pub fn encode_output(node: &OutputNode, dialect: Dialect) -> Value {
    let mut out = encode_node_spec(node, dialect);
    let mut shape = Emitter::new();
    shape
        .put_str(dialect.reference_key(), node.shape_reference_input())
        .put_float_list("scale", node.shape_scale())
        .put_float_list("offset", node.shape_offset());
    out.put_nested("shape", shape);
    if dialect.has_node_transformations() {
        out.put_opt(
            "postprocessing",
            transform::encode_list(node.postprocessing(), dialect),
        );
    }
    Value::Mapping(out.finish())
}

/// Decode `inputs` and `outputs` into the descriptor. Node names must be
/// unique on each side.
pub fn decode_nodes(
    root: Fields<'_>,
    descriptor: &mut ModelDescriptor,
    dialect: Dialect,
) -> Result<(), CodecError> {
    if let Some(items) = root.list("inputs")? {
        let mut inputs = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let path = root.element_path("inputs", i);
            let map = expect_mapping(item, path.as_str())?;
            inputs.push(decode_input(Fields::nested(map, &path), dialect)?);
        }
        descriptor.set_inputs(Some(inputs))?;
    }
    if let Some(items) = root.list("outputs")? {
        let mut outputs = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let path = root.element_path("outputs", i);
            let map = expect_mapping(item, path.as_str())?;
            outputs.push(decode_output(Fields::nested(map, &path), dialect)?);
        }
        descriptor.set_outputs(Some(outputs))?;
    }
    Ok(())
}

pub fn encode_nodes(descriptor: &ModelDescriptor, out: &mut Emitter, dialect: Dialect) {
    out.put_opt(
        "inputs",
        descriptor.inputs().map(|nodes| {
            Value::Sequence(nodes.iter().map(|n| encode_input(n, dialect)).collect())
        }),
    );
    out.put_opt(
        "outputs",
        descriptor.outputs().map(|nodes| {
            Value::Sequence(nodes.iter().map(|n| encode_output(n, dialect)).collect())
        }),
    );
}

// --- Weights ---

fn decode_weights_entry(
    f: Fields<'_>,
    format: WeightsFormat,
) -> Result<WeightsEntry, CodecError> {
    let variant = match format {
        WeightsFormat::TensorflowSavedModelBundle => WeightsVariant::TensorflowSavedModelBundle {
            tag: f.string("tag")?,
            tensorflow_version: f.string("tensorflow_version")?,
        },
        WeightsFormat::KerasHdf5 => WeightsVariant::KerasHdf5 {
            tensorflow_version: f.string("tensorflow_version")?,
        },
        WeightsFormat::TensorflowJs => WeightsVariant::TensorflowJs {
            tensorflow_version: f.string("tensorflow_version")?,
        },
        WeightsFormat::Onnx => WeightsVariant::Onnx {
            opset_version: f.integer("opset_version")?,
        },
        WeightsFormat::PytorchStateDict => WeightsVariant::PytorchStateDict {
            architecture: f.string("architecture")?,
            architecture_sha256: f.string("architecture_sha256")?,
        },
        WeightsFormat::Torchscript => WeightsVariant::Torchscript,
    };
    Ok(WeightsEntry {
        source: f.string("source")?,
        sha256: f.string("sha256")?,
        attachments: f.string_map("attachments")?,
        variant,
    })
}

fn encode_weights_entry(entry: &WeightsEntry) -> Value {
    let mut out = Emitter::new();
    out.put_str("source", entry.source.as_deref())
        .put_str("sha256", entry.sha256.as_deref())
        .put_string_map("attachments", entry.attachments.as_ref());
    match &entry.variant {
        WeightsVariant::TensorflowSavedModelBundle {
            tag,
            tensorflow_version,
        } => {
            out.put_str("tag", tag.as_deref())
                .put_str("tensorflow_version", tensorflow_version.as_deref());
        }
        WeightsVariant::KerasHdf5 { tensorflow_version }
        | WeightsVariant::TensorflowJs { tensorflow_version } => {
            out.put_str("tensorflow_version", tensorflow_version.as_deref());
        }
        WeightsVariant::Onnx { opset_version } => {
            out.put_opt("opset_version", opset_version.map(Value::from));
        }
        WeightsVariant::PytorchStateDict {
            architecture,
            architecture_sha256,
        } => {
            out.put_str("architecture", architecture.as_deref())
                .put_str("architecture_sha256", architecture_sha256.as_deref());
        }
        WeightsVariant::Torchscript => {}
    }
    Value::Mapping(out.finish())
}

/// Decode a `weights` mapping keyed by format. Unknown keys are skipped.
pub fn decode_weights_map(
    root: Fields<'_>,
    dialect: Dialect,
) -> Result<Option<BTreeMap<WeightsFormat, WeightsEntry>>, CodecError> {
    let weights_path = root.path_of("weights");
    let Some(map) = root.mapping("weights")? else {
        return Ok(None);
    };
    let weights_fields = Fields::nested(map, &weights_path);
    let empty = Mapping::new();
    let mut weights = BTreeMap::new();
    for (key, value) in map {
        let Some(key) = key.as_str() else {
            warn!(key = ?key, "skipping weights entry with a non-string key");
            continue;
        };
        let Some(format) = dialect.weights_format(key) else {
            warn!(key, "skipping weights entry of unknown format");
            continue;
        };
        let path = weights_fields.path_of(key);
        let entry = match value {
            Value::Null => &empty,
            Value::Mapping(entry) => entry,
            other => {
                return Err(CodecError::invalid(
                    path.as_str(),
                    format!("expected a mapping, found {}", kind_of(other)),
                ));
            }
        };
        weights.insert(format, decode_weights_entry(Fields::nested(entry, &path), format)?);
    }
    Ok(Some(weights))
}

pub fn encode_weights_map(descriptor: &ModelDescriptor, dialect: Dialect) -> Option<Value> {
    let weights = descriptor.weights()?;
    Some(Value::Mapping(
        weights
            .iter()
            .map(|(format, entry)| {
                (
                    Value::from(dialect.weights_key(*format)),
                    encode_weights_entry(entry),
                )
            })
            .collect(),
    ))
}

/// The single implied weights entry of generations without a format key.
///
/// Taken from a flat `weights {source, sha256, tag}` block when present,
/// otherwise the default saved-model bundle.
pub fn decode_implied_weights(root: Fields<'_>) -> Result<WeightsEntry, CodecError> {
    let path = root.path_of("weights");
    let Some(map) = root.mapping("weights")? else {
        return Ok(WeightsEntry::tensorflow_saved_model_bundle());
    };
    let mut entry = decode_weights_entry(
        Fields::nested(map, &path),
        WeightsFormat::TensorflowSavedModelBundle,
    )?;
    if let WeightsVariant::TensorflowSavedModelBundle { tag, .. } = &mut entry.variant {
        tag.get_or_insert_with(|| DEFAULT_SERVING_TAG.to_string());
    }
    Ok(entry)
}

/// Flat `weights` block for the implied entry, written only when it differs
/// from the default.
pub fn encode_implied_weights(descriptor: &ModelDescriptor) -> Option<Value> {
    let entry = descriptor.weights_for(WeightsFormat::TensorflowSavedModelBundle)?;
    if *entry == WeightsEntry::tensorflow_saved_model_bundle() {
        return None;
    }
    let mut out = Emitter::new();
    out.put_str("source", entry.source.as_deref())
        .put_str("sha256", entry.sha256.as_deref())
        .put_str("tag", entry.tag());
    Some(Value::Mapping(out.finish()))
}

// --- Legacy tool namespace ---

/// Copy the top-level `language`/`framework` and the `training` block into
/// `config.<namespace>`.
pub fn absorb_legacy_fields(
    root: Fields<'_>,
    descriptor: &mut ModelDescriptor,
    namespace: &str,
    with_training: bool,
) -> Result<(), CodecError> {
    let language = root.string("language")?;
    let framework = root.string("framework")?;
    let training = if with_training {
        root.mapping("training")?
    } else {
        None
    };
    if language.is_none() && framework.is_none() && training.is_none() {
        return Ok(());
    }
    let section = descriptor.namespace_mut(namespace);
    if let Some(language) = language {
        section.insert("language".into(), language.into());
    }
    if let Some(framework) = framework {
        section.insert("framework".into(), framework.into());
    }
    if let Some(training) = training {
        section.insert("training".into(), Value::Mapping(training.clone()));
    }
    Ok(())
}

/// Value stored under `key` in `config.<namespace>`.
pub fn legacy_value<'d>(
    descriptor: &'d ModelDescriptor,
    namespace: &str,
    key: &str,
) -> Option<&'d Value> {
    descriptor
        .namespace(namespace)?
        .get(key)
        .filter(|v| !v.is_null())
}

/// A legacy string field, ready to be written at the top level.
///
/// Only string values are lifted: the top-level key is read back as a
/// string, so anything else stays inside `config` alone.
pub fn legacy_string(
    descriptor: &ModelDescriptor,
    namespace: &str,
    key: &str,
) -> Option<Value> {
    legacy_value(descriptor, namespace, key)
        .filter(|v| v.is_string())
        .cloned()
}

/// A legacy mapping field (`training`), lifted only when it is a mapping.
pub fn legacy_mapping(
    descriptor: &ModelDescriptor,
    namespace: &str,
    key: &str,
) -> Option<Value> {
    legacy_value(descriptor, namespace, key)
        .filter(|v| v.is_mapping())
        .cloned()
}

pub fn encode_str_list(items: Option<&[String]>) -> Option<Value> {
    items.map(str_seq)
}

fn expect_mapping<'v>(value: &'v Value, path: &str) -> Result<&'v Mapping, CodecError> {
    value.as_mapping().ok_or_else(|| {
        CodecError::invalid(path, format!("expected a mapping, found {}", kind_of(value)))
    })
}
