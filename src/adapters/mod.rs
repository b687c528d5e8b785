// Adapters layer: concrete implementations of the domain ports (report storage, answer slot)

pub mod slot_store;
pub mod storage;

pub use slot_store::{JsonFileSlotStore, MemorySlotStore};
pub use storage::LocalStorage;
