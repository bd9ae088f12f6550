//! Synthetic patient generation
//!
//! - [`pipeline`] - end-to-end generate-then-ingest run
//! - [`process`] - generator child process
//! - [`workspace`] - per-job working directory with guaranteed cleanup

pub mod pipeline;
pub mod process;
pub mod workspace;

pub use pipeline::{GenerationOutcome, GenerationPipeline};
pub use process::GeneratorCommand;
pub use workspace::{GenerationJob, JobWorkspace};
