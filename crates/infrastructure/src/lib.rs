//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_draft_store;
mod http_simulation_backend;
mod in_memory_draft_store;
mod redis_draft_store;

pub use file_draft_store::FileDraftStore;
pub use http_simulation_backend::HttpSimulationBackend;
pub use in_memory_draft_store::InMemoryDraftStore;
pub use redis_draft_store::RedisDraftStore;
