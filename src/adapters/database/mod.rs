//! Store abstraction layer
//!
//! This module provides the trait-based abstraction every store backend
//! implements, the [`UnitOfWork`] wrapper that scopes one transaction, and
//! the factory that picks a backend from configuration.

pub mod factory;
pub mod traits;
pub mod unit_of_work;

pub use factory::create_store;
pub use traits::{ResourceStore, StoreSession};
pub use unit_of_work::UnitOfWork;
