//! Infrastructure layer for drafts: storage backends, path resolution and configuration.

pub mod config_service;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::paths::DraftsPaths;
pub use crate::storage::{FsRecordStore, MemoryRecordStore};
