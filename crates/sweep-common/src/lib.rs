//! sweep-common - Shared types for cloud-sweep
//!
//! This crate holds the identifier and descriptor types that both the
//! orchestration engine and its callers speak, without any AWS SDK
//! dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`descriptor`]: A single discovered resource
//! - [`region`]: Validated region identifiers
//! - [`resource_kind`]: Supported resource types and cleanup ordering

pub mod defaults;
pub mod descriptor;
pub mod region;
pub mod resource_kind;

// Re-export commonly used types
pub use descriptor::ResourceDescriptor;
pub use region::{InvalidRegion, RegionId};
pub use resource_kind::{ResourceKind, UnknownResourceKind};
