mod catalog;
mod draft_store;
mod gateway;

pub use catalog::AuthObjectCatalog;
pub use draft_store::DraftStore;
pub use gateway::{SimulationGateway, SubmittedRun};
