//! Input and output tensor descriptions.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::transformation::Transformation;

/// Closed value interval of a tensor's data. Either bound may be infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRange {
    pub min: f64,
    pub max: f64,
}

impl DataRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `[-inf, inf]`
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

/// Fields shared by input and output nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_range: Option<DataRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halo: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            axes: None,
            data_type: None,
            data_range: None,
            halo: None,
            description: None,
        }
    }
}

/// Accessors common to every node, whichever side of the model it sits on.
pub trait NodeSpecification {
    fn spec(&self) -> &NodeSpec;

    fn spec_mut(&mut self) -> &mut NodeSpec;

    fn name(&self) -> &str {
        &self.spec().name
    }

    fn axes(&self) -> Option<&str> {
        self.spec().axes.as_deref()
    }

    fn data_type(&self) -> Option<&str> {
        self.spec().data_type.as_deref()
    }

    fn data_range(&self) -> Option<DataRange> {
        self.spec().data_range
    }

    fn halo(&self) -> Option<&[i64]> {
        self.spec().halo.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.spec().description.as_deref()
    }

    /// The node's processing steps: preprocessing for inputs,
    /// postprocessing for outputs.
    fn transformations(&self) -> Option<&[Transformation]>;
}

/// A tensor the model consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputNode {
    #[serde(flatten)]
    pub spec: NodeSpec,
    shape_min: Option<Vec<i64>>,
    shape_step: Option<Vec<i64>>,
    preprocessing: Option<Vec<Transformation>>,
}

impl InputNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: NodeSpec::new(name),
            shape_min: None,
            shape_step: None,
            preprocessing: None,
        }
    }

    pub fn shape_min(&self) -> Option<&[i64]> {
        self.shape_min.as_deref()
    }

    pub fn shape_step(&self) -> Option<&[i64]> {
        self.shape_step.as_deref()
    }

    /// Set minimum shape and step together; both must have one entry per axis.
    pub fn set_shape(&mut self, min: Vec<i64>, step: Vec<i64>) -> Result<(), CodecError> {
        if min.len() != step.len() {
            return Err(CodecError::ShapeMismatch {
                node: self.spec.name.clone(),
                reason: format!(
                    "shape min has {} entries but step has {}",
                    min.len(),
                    step.len()
                ),
            });
        }
        self.shape_min = Some(min);
        self.shape_step = Some(step);
        Ok(())
    }

    /// Set only the minimum shape; allowed when no step is recorded or the
    /// lengths agree.
    pub fn set_shape_min(&mut self, min: Vec<i64>) -> Result<(), CodecError> {
        match self.shape_step.take() {
            Some(step) => self.set_shape(min, step),
            None => {
                self.shape_min = Some(min);
                Ok(())
            }
        }
    }

    pub fn preprocessing(&self) -> Option<&[Transformation]> {
        self.preprocessing.as_deref()
    }

    pub fn set_preprocessing(&mut self, steps: Option<Vec<Transformation>>) {
        self.preprocessing = steps;
    }

    pub fn add_preprocessing(&mut self, step: Transformation) {
        self.preprocessing.get_or_insert_with(Vec::new).push(step);
    }

    pub fn with_axes(mut self, axes: impl Into<String>) -> Self {
        self.spec.axes = Some(axes.into());
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.spec.data_type = Some(data_type.into());
        self
    }
}

impl NodeSpecification for InputNode {
    fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut NodeSpec {
        &mut self.spec
    }

    fn transformations(&self) -> Option<&[Transformation]> {
        self.preprocessing()
    }
}

/// A tensor the model produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    #[serde(flatten)]
    pub spec: NodeSpec,
    shape_reference_input: Option<String>,
    shape_scale: Option<Vec<f64>>,
    shape_offset: Option<Vec<f64>>,
    postprocessing: Option<Vec<Transformation>>,
}

impl OutputNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: NodeSpec::new(name),
            shape_reference_input: None,
            shape_scale: None,
            shape_offset: None,
            postprocessing: None,
        }
    }

    /// Name of the input whose shape this output's shape is derived from.
    pub fn shape_reference_input(&self) -> Option<&str> {
        self.shape_reference_input.as_deref()
    }

    pub fn set_shape_reference_input(&mut self, input: Option<String>) {
        self.shape_reference_input = input;
    }

    pub fn shape_scale(&self) -> Option<&[f64]> {
        self.shape_scale.as_deref()
    }

    pub fn shape_offset(&self) -> Option<&[f64]> {
        self.shape_offset.as_deref()
    }

    /// Set scale and offset together; both must have one entry per axis.
    /// Either may be absent, in which case no length check applies.
    pub fn set_shape(
        &mut self,
        scale: Option<Vec<f64>>,
        offset: Option<Vec<f64>>,
    ) -> Result<(), CodecError> {
        if let (Some(s), Some(o)) = (&scale, &offset) {
            if s.len() != o.len() {
                return Err(CodecError::ShapeMismatch {
                    node: self.spec.name.clone(),
                    reason: format!(
                        "shape scale has {} entries but offset has {}",
                        s.len(),
                        o.len()
                    ),
                });
            }
        }
        self.shape_scale = scale;
        self.shape_offset = offset;
        Ok(())
    }

    pub fn postprocessing(&self) -> Option<&[Transformation]> {
        self.postprocessing.as_deref()
    }

    pub fn set_postprocessing(&mut self, steps: Option<Vec<Transformation>>) {
        self.postprocessing = steps;
    }

    pub fn add_postprocessing(&mut self, step: Transformation) {
        self.postprocessing.get_or_insert_with(Vec::new).push(step);
    }

    pub fn with_axes(mut self, axes: impl Into<String>) -> Self {
        self.spec.axes = Some(axes.into());
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.spec.data_type = Some(data_type.into());
        self
    }
}

impl NodeSpecification for OutputNode {
    fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut NodeSpec {
        &mut self.spec
    }

    fn transformations(&self) -> Option<&[Transformation]> {
        self.postprocessing()
    }
}
