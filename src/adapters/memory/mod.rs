//! In-memory store backend, used for dry runs and tests

pub mod store;

pub use store::InMemoryStore;
