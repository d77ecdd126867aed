//! Session history components.
//!
//! - `identity`: Reference minting and namespace lifetime
//! - `metadata`: Metadata record persistence
//! - `variants`: Per-variant trace and code artifacts
//! - `lineage`: Parent resolution, stacks and the history list

pub mod identity;
pub mod lineage;
pub mod metadata;
pub mod variants;

pub use identity::{Clock, SessionAllocator, system_clock};
pub use lineage::LineageResolver;
pub use metadata::{METADATA_RECORD, MetadataStore};
pub use variants::VariantStore;
