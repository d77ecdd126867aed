pub mod bootstrap;
pub mod sessions;
pub mod variants;
