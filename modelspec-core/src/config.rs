//! Configuration system for modelspec.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides.
//! Configuration is loaded from the user config directory (for example
//! `~/.config/modelspec/config.toml`) and/or `.modelspec/config.toml` in the
//! workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::{CodecOptions, DEFAULT_LEGACY_NAMESPACE};
use crate::error::ConfigError;
use crate::model::NEWEST_FORMAT_VERSION;

/// Name of the descriptor file inside a model directory or archive.
pub const DEFAULT_DESCRIPTOR_FILE_NAME: &str = "rdf.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecConfig {
    /// File name looked up first when reading a directory or archive.
    pub descriptor_file_name: String,
    /// Older file names tried, in order, when the primary one is absent.
    pub legacy_file_names: Vec<String>,
    /// Tool namespace under `config` that receives legacy top-level fields.
    pub legacy_namespace: String,
    /// Version targeted by `convert` when none is given.
    pub default_format_version: String,
    pub output_format: OutputFormat,
    /// When set, the CLI also writes JSON logs here, rolled daily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            descriptor_file_name: DEFAULT_DESCRIPTOR_FILE_NAME.to_string(),
            legacy_file_names: vec!["model.yaml".to_string()],
            legacy_namespace: DEFAULT_LEGACY_NAMESPACE.to_string(),
            default_format_version: NEWEST_FORMAT_VERSION.to_string(),
            output_format: OutputFormat::default(),
            log_dir: None,
        }
    }
}

impl SpecConfig {
    /// Codec settings derived from this configuration.
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            legacy_namespace: self.legacy_namespace.clone(),
        }
    }

    /// Descriptor file names in lookup order.
    pub fn descriptor_file_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.descriptor_file_name.as_str())
            .chain(self.legacy_file_names.iter().map(String::as_str))
    }

    /// Reject values that would make the store or codecs misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.descriptor_file_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "descriptor_file_name must not be empty".to_string(),
            });
        }
        if self.legacy_namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "legacy_namespace must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Serialization used when writing descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                message: format!("unknown output format '{}'", other),
            }),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "modelspec", "modelspec")
}

/// Path of the user-level config file, whether or not it exists.
pub fn user_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file, whether or not it exists.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".modelspec").join("config.toml")
}

/// Load configuration by merging all layers.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SpecConfig>,
) -> Result<SpecConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(SpecConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (MODELSPEC_LEGACY_NAMESPACE, MODELSPEC_OUTPUT_FORMAT, etc.)
    figment = figment.merge(Env::prefixed("MODELSPEC_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment
        .extract()
        .map_err(|e| ConfigError::Parse(Box::new(e)))
}

/// Check whether any modelspec configuration file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}
