//! Core domain layer for drafts.
//!
//! Holds the session model, the error taxonomy, the configuration model and the
//! [`storage::RecordStore`] trait that every persistence backend implements.

pub mod config;
pub mod error;
pub mod session;
pub mod storage;

// Re-export common error type
pub use error::{DraftsError, Result};
