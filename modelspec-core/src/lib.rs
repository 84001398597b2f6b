//! # modelspec core
//!
//! Reader and writer for machine-learning model descriptor documents.
//! Provides the descriptor entity model, the closed set of tensor
//! transformations, one codec per document generation, the registry that
//! dispatches between them, filesystem and archive access, configuration
//! and errors.

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod store;
pub mod transformation;

// Re-export commonly used types at the crate root.
pub use codec::registry::GenerationInfo;
pub use codec::{
    CodecOptions, CodecRegistry, DEFAULT_LEGACY_NAMESPACE, SchemaCodec, V1Codec, V2Codec, V3Codec,
    V4Codec,
};
pub use config::{OutputFormat, SpecConfig, load_config};
pub use document::Document;
pub use error::{ArchiveError, CodecError, ConfigError, DocumentError, Result, SpecError};
pub use model::{
    Author, Badge, Citation, DataRange, InputNode, ModelDescriptor, NEWEST_FORMAT_VERSION,
    NodeSpec, NodeSpecification, OutputNode, ParentRef, WeightsEntry, WeightsFormat,
    WeightsVariant,
};
pub use store::{DescriptorStore, open_named_entry};
pub use transformation::{Mode, Transformation, TransformationKind};
