//! Entity model: the in-memory descriptor graph.

pub mod descriptor;
pub mod node;
pub mod records;
pub mod weights;

pub use descriptor::{ModelDescriptor, NEWEST_FORMAT_VERSION};
pub use node::{DataRange, InputNode, NodeSpec, NodeSpecification, OutputNode};
pub use records::{Author, Badge, Citation, ParentRef};
pub use weights::{DEFAULT_SERVING_TAG, WeightsEntry, WeightsFormat, WeightsVariant};
