//! Session domain module.
//!
//! # Module Structure
//!
//! - `reference`: Session identity (`SessionRef`, `ParentRef`)
//! - `model`: Metadata records, variants and the read views built from them

mod model;
mod reference;

// Re-export public API
pub use model::{
    INPUT_MODE_FIELD, PARENT_FIELD, PROMPT_FIELD, SessionDetail, SessionMetadata, SessionSummary,
    StackEntry, TITLE_FIELD, Variant,
};
pub use reference::{LOCAL_ID_SUFFIX_LEN, ParentRef, SessionRef};
