//! Block descriptors and the name-to-id registry.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod types;

pub use config::{BlockDef, BlocksConfig};
pub use registry::{BlockRegistry, RegistryError};
pub use types::{AIR_NAME, BlockFlags, BlockId, BlockType};
