//! Service layer
//!
//! The execution service is the job orchestrator: it sequences the
//! pipeline stages, records metrics and maps the outcome to a response.
//! It is trait-based so the HTTP layer can be tested against a mock.

mod execution;

pub use execution::{ExecutionService, JobOutcome, StandardExecutionService};
