//! Weight-format descriptors.
//!
//! A descriptor holds at most one [`WeightsEntry`] per [`WeightsFormat`].
//! The set of formats is closed here; a codec meeting a key it does not know
//! skips that entry instead of failing the whole decode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Serving tag assumed for a native saved-model bundle when none is given.
pub const DEFAULT_SERVING_TAG: &str = "serve";

/// Family of serialized weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightsFormat {
    TensorflowSavedModelBundle,
    KerasHdf5,
    TensorflowJs,
    Onnx,
    PytorchStateDict,
    Torchscript,
}

impl WeightsFormat {
    pub const ALL: [WeightsFormat; 6] = [
        WeightsFormat::TensorflowSavedModelBundle,
        WeightsFormat::KerasHdf5,
        WeightsFormat::TensorflowJs,
        WeightsFormat::Onnx,
        WeightsFormat::PytorchStateDict,
        WeightsFormat::Torchscript,
    ];

    /// Canonical key, as written by the newest generation.
    pub fn key(&self) -> &'static str {
        match self {
            WeightsFormat::TensorflowSavedModelBundle => "tensorflow_saved_model_bundle",
            WeightsFormat::KerasHdf5 => "keras_hdf5",
            WeightsFormat::TensorflowJs => "tensorflow_js",
            WeightsFormat::Onnx => "onnx",
            WeightsFormat::PytorchStateDict => "pytorch_state_dict",
            WeightsFormat::Torchscript => "torchscript",
        }
    }

    /// Case-sensitive lookup of a canonical key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.key() == key)
    }
}

impl fmt::Display for WeightsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Format-specific extras of a weights entry. The variant fixes the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum WeightsVariant {
    TensorflowSavedModelBundle {
        tag: Option<String>,
        tensorflow_version: Option<String>,
    },
    KerasHdf5 {
        tensorflow_version: Option<String>,
    },
    TensorflowJs {
        tensorflow_version: Option<String>,
    },
    Onnx {
        opset_version: Option<i64>,
    },
    PytorchStateDict {
        architecture: Option<String>,
        architecture_sha256: Option<String>,
    },
    Torchscript,
}

impl WeightsVariant {
    /// Variant for `format` with every extra absent.
    pub fn empty(format: WeightsFormat) -> Self {
        match format {
            WeightsFormat::TensorflowSavedModelBundle => {
                WeightsVariant::TensorflowSavedModelBundle {
                    tag: None,
                    tensorflow_version: None,
                }
            }
            WeightsFormat::KerasHdf5 => WeightsVariant::KerasHdf5 {
                tensorflow_version: None,
            },
            WeightsFormat::TensorflowJs => WeightsVariant::TensorflowJs {
                tensorflow_version: None,
            },
            WeightsFormat::Onnx => WeightsVariant::Onnx {
                opset_version: None,
            },
            WeightsFormat::PytorchStateDict => WeightsVariant::PytorchStateDict {
                architecture: None,
                architecture_sha256: None,
            },
            WeightsFormat::Torchscript => WeightsVariant::Torchscript,
        }
    }

    pub fn format(&self) -> WeightsFormat {
        match self {
            WeightsVariant::TensorflowSavedModelBundle { .. } => {
                WeightsFormat::TensorflowSavedModelBundle
            }
            WeightsVariant::KerasHdf5 { .. } => WeightsFormat::KerasHdf5,
            WeightsVariant::TensorflowJs { .. } => WeightsFormat::TensorflowJs,
            WeightsVariant::Onnx { .. } => WeightsFormat::Onnx,
            WeightsVariant::PytorchStateDict { .. } => WeightsFormat::PytorchStateDict,
            WeightsVariant::Torchscript => WeightsFormat::Torchscript,
        }
    }
}

/// One serialized form of the model's weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightsEntry {
    pub source: Option<String>,
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<BTreeMap<String, String>>,
    pub variant: WeightsVariant,
}

impl WeightsEntry {
    pub fn new(variant: WeightsVariant) -> Self {
        Self {
            source: None,
            sha256: None,
            attachments: None,
            variant,
        }
    }

    /// Native saved-model bundle with the default serving tag and nothing else.
    pub fn tensorflow_saved_model_bundle() -> Self {
        Self::new(WeightsVariant::TensorflowSavedModelBundle {
            tag: Some(DEFAULT_SERVING_TAG.to_string()),
            tensorflow_version: None,
        })
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn format(&self) -> WeightsFormat {
        self.variant.format()
    }

    /// Serving tag, for saved-model bundles only.
    pub fn tag(&self) -> Option<&str> {
        match &self.variant {
            WeightsVariant::TensorflowSavedModelBundle { tag, .. } => tag.as_deref(),
            _ => None,
        }
    }
}
