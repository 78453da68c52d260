//! In-process adapters.

pub mod object_store;

pub use object_store::{InMemoryObjectStore, StoreStats};
