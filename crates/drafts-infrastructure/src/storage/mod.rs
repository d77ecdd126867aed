//! Storage backends implementing [`drafts_core::storage::RecordStore`].

mod atomic_file;
mod fs_record_store;
mod memory_record_store;

pub use atomic_file::AtomicFile;
pub use fs_record_store::FsRecordStore;
pub use memory_record_store::MemoryRecordStore;
