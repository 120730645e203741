//! Pipeline orchestration for Leadscout.
//!
//! Ties the collaborator, search, and ranking layers together into the
//! end-to-end discovery run. Front-ends (the CLI today) depend on this
//! crate and provide a [`ProgressReporter`] for user-facing status.

mod pipeline;

pub use pipeline::{ProgressReporter, RunOutcome, SilentProgress, run};
