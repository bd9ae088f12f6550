//! Persistence units shared by patient sync and generator harvesting
//!
//! - [`upsert`] - insert-or-refresh of a single resource
//! - [`envelope`] - storage of a whole bundle as one envelope
//!
//! Both units write through a caller-owned [`UnitOfWork`](crate::adapters::database::UnitOfWork)
//! and never commit on their own.

pub mod envelope;
pub mod upsert;

pub use envelope::EnvelopePersister;
pub use upsert::{ResourceUpserter, UpsertOutcome};
