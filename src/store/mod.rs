pub mod entity;
pub mod registry;

pub use entity::{EntityStore, StoreMark, StoreSnapshot, StoreStatus, UpsertOutcome, ViewStore};
pub use registry::StoreRegistry;
