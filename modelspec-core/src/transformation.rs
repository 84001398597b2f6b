//! Image pre/post-processing operator descriptors.
//!
//! [`Transformation`] is a closed union: adding an operator means adding a
//! variant, and every `match` over it stops compiling until the new variant is
//! handled. Each variant records its numeric parameters and a [`Mode`] saying
//! whether those parameters are precomputed constants or recomputed at
//! inference time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// When the parameters of a transformation are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Parameters are constants stored in the descriptor.
    Fixed,
    /// Parameters are computed once over the whole dataset.
    PerDataset,
    /// Parameters are recomputed for every sample.
    PerSample,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fixed => "fixed",
            Mode::PerDataset => "per_dataset",
            Mode::PerSample => "per_sample",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Mode::Fixed),
            "per_dataset" => Ok(Mode::PerDataset),
            "per_sample" => Ok(Mode::PerSample),
            other => Err(format!(
                "unknown mode '{}' (expected fixed, per_dataset or per_sample)",
                other
            )),
        }
    }
}

/// Discriminant of a [`Transformation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationKind {
    ScaleLinear,
    ZeroMeanUnitVariance,
    ScaleMinMax,
    Percentile,
    Binarize,
    Clip,
}

impl TransformationKind {
    pub const ALL: [TransformationKind; 6] = [
        TransformationKind::ScaleLinear,
        TransformationKind::ZeroMeanUnitVariance,
        TransformationKind::ScaleMinMax,
        TransformationKind::Percentile,
        TransformationKind::Binarize,
        TransformationKind::Clip,
    ];
}

impl fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformationKind::ScaleLinear => "scale_linear",
            TransformationKind::ZeroMeanUnitVariance => "zero_mean_unit_variance",
            TransformationKind::ScaleMinMax => "scale_min_max",
            TransformationKind::Percentile => "percentile",
            TransformationKind::Binarize => "binarize",
            TransformationKind::Clip => "clip",
        };
        f.write_str(name)
    }
}

/// `out = in * gain + offset`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleLinear {
    pub gain: Option<f64>,
    pub offset: Option<f64>,
    pub mode: Option<Mode>,
    pub axes: Option<String>,
}

/// `out = (in - mean) / std`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZeroMeanUnitVariance {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub mode: Option<Mode>,
    pub axes: Option<String>,
}

/// Rescale using percentiles measured on another tensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleMinMax {
    pub reference_input: Option<String>,
    pub min_percentile: Option<f64>,
    pub max_percentile: Option<f64>,
    pub mode: Option<Mode>,
    pub axes: Option<String>,
}

/// Rescale using percentiles of the tensor itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    pub min_percentile: Option<f64>,
    pub max_percentile: Option<f64>,
    pub mode: Option<Mode>,
    pub axes: Option<String>,
}

/// `out = in > threshold`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binarize {
    pub threshold: Option<f64>,
    pub mode: Option<Mode>,
    pub axes: Option<String>,
}

/// Clamp values into `[min, max]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mode: Option<Mode>,
    pub axes: Option<String>,
}

/// A single pre- or post-processing step attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    ScaleLinear(ScaleLinear),
    ZeroMeanUnitVariance(ZeroMeanUnitVariance),
    ScaleMinMax(ScaleMinMax),
    Percentile(Percentile),
    Binarize(Binarize),
    Clip(Clip),
}

impl Transformation {
    /// Fixed-parameter linear scaling.
    pub fn scale_linear(gain: f64, offset: f64) -> Self {
        Transformation::ScaleLinear(ScaleLinear {
            gain: Some(gain),
            offset: Some(offset),
            mode: Some(Mode::Fixed),
            axes: None,
        })
    }

    /// Fixed-parameter normalization to zero mean and unit variance.
    pub fn zero_mean_unit_variance(mean: f64, std: f64) -> Self {
        Transformation::ZeroMeanUnitVariance(ZeroMeanUnitVariance {
            mean: Some(mean),
            std: Some(std),
            mode: Some(Mode::Fixed),
            axes: None,
        })
    }

    pub fn kind(&self) -> TransformationKind {
        match self {
            Transformation::ScaleLinear(_) => TransformationKind::ScaleLinear,
            Transformation::ZeroMeanUnitVariance(_) => TransformationKind::ZeroMeanUnitVariance,
            Transformation::ScaleMinMax(_) => TransformationKind::ScaleMinMax,
            Transformation::Percentile(_) => TransformationKind::Percentile,
            Transformation::Binarize(_) => TransformationKind::Binarize,
            Transformation::Clip(_) => TransformationKind::Clip,
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        match self {
            Transformation::ScaleLinear(t) => t.mode,
            Transformation::ZeroMeanUnitVariance(t) => t.mode,
            Transformation::ScaleMinMax(t) => t.mode,
            Transformation::Percentile(t) => t.mode,
            Transformation::Binarize(t) => t.mode,
            Transformation::Clip(t) => t.mode,
        }
    }

    pub fn set_mode(&mut self, mode: Option<Mode>) {
        match self {
            Transformation::ScaleLinear(t) => t.mode = mode,
            Transformation::ZeroMeanUnitVariance(t) => t.mode = mode,
            Transformation::ScaleMinMax(t) => t.mode = mode,
            Transformation::Percentile(t) => t.mode = mode,
            Transformation::Binarize(t) => t.mode = mode,
            Transformation::Clip(t) => t.mode = mode,
        }
    }

    pub fn axes(&self) -> Option<&str> {
        let axes = match self {
            Transformation::ScaleLinear(t) => &t.axes,
            Transformation::ZeroMeanUnitVariance(t) => &t.axes,
            Transformation::ScaleMinMax(t) => &t.axes,
            Transformation::Percentile(t) => &t.axes,
            Transformation::Binarize(t) => &t.axes,
            Transformation::Clip(t) => &t.axes,
        };
        axes.as_deref()
    }
}
