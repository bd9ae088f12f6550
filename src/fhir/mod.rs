//! FHIR R4 document model and codec
//!
//! - [`bundle`] - typed view over `Bundle`, `Bundle.entry` and resources
//! - [`codec`] - document conversion and bundle parsing

pub mod bundle;
pub mod codec;

pub use bundle::{Bundle, BundleEntry, BundleLink, Document, Resource};
pub use codec::{parse_bundle, to_document};
