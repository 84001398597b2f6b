//! Filesystem access for descriptors: plain files, model directories and zip
//! archives.
//!
//! The store reads bytes, hands them to the document layer and then to the
//! codec registry. It never resolves the locators a descriptor contains.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::codec::CodecRegistry;
use crate::config::{OutputFormat, SpecConfig};
use crate::document::{self, Document};
use crate::error::{ArchiveError, Result, SpecError};
use crate::model::ModelDescriptor;

/// Upper bound on the buffer reserved up front for an archive entry.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Read one named entry of a zip archive into memory.
pub fn open_named_entry(archive: &Path, entry: &str) -> Result<Vec<u8>> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Invalid {
        archive: archive.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut found = match zip.by_name(entry) {
        Ok(found) => found,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ArchiveError::EntryNotFound {
                archive: archive.to_path_buf(),
                entry: entry.to_string(),
            }
            .into());
        }
        Err(e) => {
            return Err(ArchiveError::Invalid {
                archive: archive.to_path_buf(),
                message: e.to_string(),
            }
            .into());
        }
    };
    let mut buf = Vec::with_capacity(initial_capacity(found.size()));
    found.read_to_end(&mut buf)?;
    Ok(buf)
}

// The declared size comes from the archive itself and is not trusted.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0)
}

/// Reads and writes descriptors using a codec registry and a configuration.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    config: SpecConfig,
    registry: CodecRegistry,
}

impl Default for DescriptorStore {
    fn default() -> Self {
        Self::new(SpecConfig::default())
    }
}

impl DescriptorStore {
    /// A store with the built-in codecs configured from `config`.
    pub fn new(config: SpecConfig) -> Self {
        let registry = CodecRegistry::with_options(config.codec_options());
        Self { config, registry }
    }

    pub fn with_registry(config: SpecConfig, registry: CodecRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &SpecConfig {
        &self.config
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Parse and decode raw descriptor bytes.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<ModelDescriptor> {
        let doc = document::parse(bytes)?;
        Ok(self.registry.decode_any(&doc)?)
    }

    /// Read a descriptor file.
    pub fn read_file(&self, path: &Path) -> Result<ModelDescriptor> {
        let bytes = std::fs::read(path)?;
        let descriptor = self.read_bytes(&bytes)?;
        info!(
            path = %path.display(),
            format_version = descriptor.format_version(),
            "read descriptor"
        );
        Ok(descriptor)
    }

    /// Locate the descriptor file of a model directory.
    pub fn find_in_directory(&self, dir: &Path) -> Option<PathBuf> {
        self.config
            .descriptor_file_names()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Read the descriptor of a model directory, falling back to legacy
    /// file names.
    pub fn read_directory(&self, dir: &Path) -> Result<ModelDescriptor> {
        let path = self.find_in_directory(dir).ok_or_else(|| {
            SpecError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "no {} found in {}",
                    self.config.descriptor_file_name,
                    dir.display()
                ),
            ))
        })?;
        self.read_file(&path)
    }

    /// Read the descriptor entry of a zip archive.
    pub fn read_archive(&self, archive: &Path) -> Result<ModelDescriptor> {
        for name in self.config.descriptor_file_names() {
            match open_named_entry(archive, name) {
                Ok(bytes) => {
                    let descriptor = self.read_bytes(&bytes)?;
                    info!(
                        archive = %archive.display(),
                        entry = name,
                        format_version = descriptor.format_version(),
                        "read descriptor from archive"
                    );
                    return Ok(descriptor);
                }
                Err(SpecError::Archive(ArchiveError::EntryNotFound { .. })) => {
                    debug!(archive = %archive.display(), entry = name, "entry not in archive");
                }
                Err(e) => return Err(e),
            }
        }
        Err(ArchiveError::EntryNotFound {
            archive: archive.to_path_buf(),
            entry: self.config.descriptor_file_name.clone(),
        }
        .into())
    }

    /// Read from a directory, a zip archive or a plain descriptor file.
    pub fn read_path(&self, path: &Path) -> Result<ModelDescriptor> {
        if path.is_dir() {
            return self.read_directory(path);
        }
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
        if is_zip {
            self.read_archive(path)
        } else {
            self.read_file(path)
        }
    }

    /// Encode with the codec matching the descriptor's version and render
    /// the document in `format`.
    pub fn render(&self, descriptor: &ModelDescriptor, format: OutputFormat) -> Result<String> {
        let doc = self.registry.encode_for(descriptor)?;
        Ok(render_document(&doc, format)?)
    }

    /// Write a descriptor file. The format follows the extension, then the
    /// configured default.
    pub fn write_file(&self, descriptor: &ModelDescriptor, path: &Path) -> Result<()> {
        let format = OutputFormat::from_path(path).unwrap_or(self.config.output_format);
        let text = self.render(descriptor, format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        info!(
            path = %path.display(),
            format = %format,
            format_version = descriptor.format_version(),
            "wrote descriptor"
        );
        Ok(())
    }

    /// Write the descriptor file of a model directory, creating the
    /// directory when needed. Returns the path written.
    pub fn write_directory(&self, descriptor: &ModelDescriptor, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.config.descriptor_file_name);
        self.write_file(descriptor, &path)?;
        Ok(path)
    }
}

fn render_document(
    doc: &Document,
    format: OutputFormat,
) -> std::result::Result<String, crate::error::DocumentError> {
    match format {
        OutputFormat::Yaml => document::to_yaml_string(doc),
        OutputFormat::Json => document::to_json_string(doc),
    }
}
