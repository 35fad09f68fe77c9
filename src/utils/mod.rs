//! Utility modules shared by the mapper and the orchestrator.
//!
//! - [`datetime`] - timestamp parsing and date helpers

pub mod datetime;
