//! Application layer for drafts.
//!
//! This crate composes the session components over a [`RecordStore`] and exposes them
//! through [`HistoryService`].
//!
//! [`RecordStore`]: drafts_core::storage::RecordStore

pub mod history_service;
pub mod session;

pub use history_service::{HistoryOptions, HistoryService};

#[cfg(test)]
pub(crate) mod test_support;
