//! The model descriptor: root of the metadata graph.
//!
//! Optional attributes are `Option`s all the way out to the accessors:
//! `citations() == None` means the document said nothing about citations,
//! `citations() == Some(&[])` means it explicitly listed none. List getters
//! hand out slices; changes go through the `set_*` / `add_*` methods so that
//! invariants such as node-name uniqueness are checked in one place.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};

use crate::error::CodecError;
use crate::model::node::{InputNode, NodeSpecification, OutputNode};
use crate::model::records::{Author, Badge, Citation, ParentRef};
use crate::model::weights::{WeightsEntry, WeightsFormat};

/// Canonical version of the newest supported generation.
pub const NEWEST_FORMAT_VERSION: &str = "0.4.0";

macro_rules! optional_string {
    ($($(#[$doc:meta])* $field:ident, $setter:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $field(&self) -> Option<&str> {
                self.$field.as_deref()
            }

            pub fn $setter(&mut self, value: Option<String>) {
                self.$field = value;
            }
        )*
    };
}

macro_rules! optional_list {
    ($($field:ident: $ty:ty, $setter:ident, $adder:ident;)*) => {
        $(
            pub fn $field(&self) -> Option<&[$ty]> {
                self.$field.as_deref()
            }

            pub fn $setter(&mut self, value: Option<Vec<$ty>>) {
                self.$field = value;
            }

            pub fn $adder(&mut self, item: $ty) {
                self.$field.get_or_insert_with(Vec::new).push(item);
            }
        )*
    };
}

/// Metadata describing one machine-learning model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    format_version: String,
    name: Option<String>,
    description: Option<String>,
    documentation: Option<String>,
    license: Option<String>,
    tags: Option<Vec<String>>,
    source: Option<String>,
    git_repo: Option<String>,
    timestamp: Option<String>,
    hash: Option<String>,
    version: Option<String>,
    #[serde(rename = "type")]
    model_type: Option<String>,
    execution_model: Option<String>,
    packaged_by: Option<String>,
    dependencies: Option<String>,
    attachments: Option<BTreeMap<String, String>>,
    covers: Option<Vec<String>>,
    test_inputs: Option<Vec<String>>,
    test_outputs: Option<Vec<String>>,
    sample_inputs: Option<Vec<String>>,
    sample_outputs: Option<Vec<String>>,
    config: Option<Mapping>,
    parent: Option<ParentRef>,
    authors: Option<Vec<Author>>,
    citations: Option<Vec<Citation>>,
    badges: Option<Vec<Badge>>,
    inputs: Option<Vec<InputNode>>,
    outputs: Option<Vec<OutputNode>>,
    weights: Option<BTreeMap<WeightsFormat, WeightsEntry>>,
}

impl Default for ModelDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelDescriptor {
    /// An empty descriptor targeting the newest generation.
    pub fn new() -> Self {
        Self::with_format_version(NEWEST_FORMAT_VERSION)
    }

    /// An empty descriptor targeting `format_version`.
    pub fn with_format_version(format_version: impl Into<String>) -> Self {
        Self {
            format_version: format_version.into(),
            name: None,
            description: None,
            documentation: None,
            license: None,
            tags: None,
            source: None,
            git_repo: None,
            timestamp: None,
            hash: None,
            version: None,
            model_type: None,
            execution_model: None,
            packaged_by: None,
            dependencies: None,
            attachments: None,
            covers: None,
            test_inputs: None,
            test_outputs: None,
            sample_inputs: None,
            sample_outputs: None,
            config: None,
            parent: None,
            authors: None,
            citations: None,
            badges: None,
            inputs: None,
            outputs: None,
            weights: None,
        }
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    pub fn set_format_version(&mut self, version: impl Into<String>) {
        self.format_version = version.into();
    }

    /// Retarget the descriptor at the newest known generation.
    pub fn update_to_newest_version(&mut self) {
        self.format_version = NEWEST_FORMAT_VERSION.to_string();
    }

    optional_string! {
        name, set_name;
        description, set_description;
        /// Locator of the long-form documentation.
        documentation, set_documentation;
        license, set_license;
        /// Locator of the model source; never the training placeholder.
        source, set_source;
        git_repo, set_git_repo;
        timestamp, set_timestamp;
        /// Content digest of the descriptor document.
        hash, set_hash;
        version, set_version;
        /// Resource type, e.g. `model`.
        model_type, set_model_type;
        execution_model, set_execution_model;
        packaged_by, set_packaged_by;
        dependencies, set_dependencies;
    }

    optional_list! {
        covers: String, set_covers, add_cover;
        test_inputs: String, set_test_inputs, add_test_input;
        test_outputs: String, set_test_outputs, add_test_output;
        sample_inputs: String, set_sample_inputs, add_sample_input;
        sample_outputs: String, set_sample_outputs, add_sample_output;
        authors: Author, set_authors, add_author;
        citations: Citation, set_citations, add_citation;
        badges: Badge, set_badges, add_badge;
    }

    // --- Tags (ordered set) ---

    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }

    /// Replace the tags; later duplicates are dropped, first occurrence wins.
    pub fn set_tags(&mut self, tags: Option<Vec<String>>) {
        self.tags = tags.map(|tags| {
            let mut seen = HashSet::new();
            tags.into_iter()
                .filter(|tag| seen.insert(tag.clone()))
                .collect()
        });
    }

    /// Append a tag unless it is already present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let tags = self.tags.get_or_insert_with(Vec::new);
        if tags.contains(&tag) {
            return false;
        }
        tags.push(tag);
        true
    }

    // --- Attachments ---

    pub fn attachments(&self) -> Option<&BTreeMap<String, String>> {
        self.attachments.as_ref()
    }

    pub fn set_attachments(&mut self, attachments: Option<BTreeMap<String, String>>) {
        self.attachments = attachments;
    }

    pub fn add_attachment(&mut self, name: impl Into<String>, locator: impl Into<String>) {
        self.attachments
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), locator.into());
    }

    // --- Tool configuration ---

    pub fn config(&self) -> Option<&Mapping> {
        self.config.as_ref()
    }

    pub fn set_config(&mut self, config: Option<Mapping>) {
        self.config = config;
    }

    /// The configuration section owned by `tool`, if present.
    pub fn namespace(&self, tool: &str) -> Option<&Mapping> {
        self.config.as_ref()?.get(tool)?.as_mapping()
    }

    /// The configuration section owned by `tool`, created when missing.
    ///
    /// A non-mapping value already stored under `tool` is replaced.
    pub fn namespace_mut(&mut self, tool: &str) -> &mut Mapping {
        let config = self.config.get_or_insert_with(Mapping::new);
        let key = Value::String(tool.to_string());
        if !config.get(&key).is_some_and(Value::is_mapping) {
            config.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        match config.get_mut(&key) {
            Some(Value::Mapping(section)) => section,
            _ => unreachable!("namespace entry was just set to a mapping"),
        }
    }

    // --- Parent ---

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    pub fn set_parent(&mut self, parent: Option<ParentRef>) {
        self.parent = parent;
    }

    // --- Nodes ---

    pub fn inputs(&self) -> Option<&[InputNode]> {
        self.inputs.as_deref()
    }

    pub fn outputs(&self) -> Option<&[OutputNode]> {
        self.outputs.as_deref()
    }

    pub fn input(&self, name: &str) -> Option<&InputNode> {
        self.inputs.as_ref()?.iter().find(|n| n.name() == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputNode> {
        self.outputs.as_ref()?.iter().find(|n| n.name() == name)
    }

    /// Nodes in place; the list itself can only change through `set_*`/`add_*`.
    pub fn inputs_mut(&mut self) -> Option<&mut [InputNode]> {
        self.inputs.as_deref_mut()
    }

    pub fn outputs_mut(&mut self) -> Option<&mut [OutputNode]> {
        self.outputs.as_deref_mut()
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut InputNode> {
        self.inputs.as_mut()?.iter_mut().find(|n| n.name() == name)
    }

    pub fn output_mut(&mut self, name: &str) -> Option<&mut OutputNode> {
        self.outputs.as_mut()?.iter_mut().find(|n| n.name() == name)
    }

    /// Replace the input list. Names must be unique.
    pub fn set_inputs(&mut self, inputs: Option<Vec<InputNode>>) -> Result<(), CodecError> {
        if let Some(nodes) = &inputs {
            ensure_unique_names(nodes.iter().map(|n| n.name()))?;
        }
        self.inputs = inputs;
        Ok(())
    }

    /// Replace the output list. Names must be unique.
    pub fn set_outputs(&mut self, outputs: Option<Vec<OutputNode>>) -> Result<(), CodecError> {
        if let Some(nodes) = &outputs {
            ensure_unique_names(nodes.iter().map(|n| n.name()))?;
        }
        self.outputs = outputs;
        Ok(())
    }

    pub fn add_input(&mut self, node: InputNode) -> Result<(), CodecError> {
        if self.input(node.name()).is_some() {
            return Err(CodecError::DuplicateNodeName {
                name: node.name().to_string(),
            });
        }
        self.inputs.get_or_insert_with(Vec::new).push(node);
        Ok(())
    }

    pub fn add_output(&mut self, node: OutputNode) -> Result<(), CodecError> {
        if self.output(node.name()).is_some() {
            return Err(CodecError::DuplicateNodeName {
                name: node.name().to_string(),
            });
        }
        self.outputs.get_or_insert_with(Vec::new).push(node);
        Ok(())
    }

    // --- Weights ---

    pub fn weights(&self) -> Option<&BTreeMap<WeightsFormat, WeightsEntry>> {
        self.weights.as_ref()
    }

    pub fn weights_for(&self, format: WeightsFormat) -> Option<&WeightsEntry> {
        self.weights.as_ref()?.get(&format)
    }

    /// Look up weights by canonical format key. Case-sensitive; unknown keys
    /// yield `None`.
    pub fn weights_by_key(&self, key: &str) -> Option<&WeightsEntry> {
        self.weights_for(WeightsFormat::from_key(key)?)
    }

    /// Insert an entry under its own format, returning the entry it replaced.
    pub fn add_weights(&mut self, entry: WeightsEntry) -> Option<WeightsEntry> {
        self.weights
            .get_or_insert_with(BTreeMap::new)
            .insert(entry.format(), entry)
    }

    pub fn set_weights(&mut self, weights: Option<BTreeMap<WeightsFormat, WeightsEntry>>) {
        self.weights = weights;
    }

    pub fn remove_weights(&mut self, format: WeightsFormat) -> Option<WeightsEntry> {
        self.weights.as_mut()?.remove(&format)
    }
}

fn ensure_unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), CodecError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CodecError::DuplicateNodeName {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
