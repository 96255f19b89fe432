//! Shared types and filesystem helpers used across all tunedrop crates.

pub mod fs;
pub mod types;

pub use types::{Artifact, RequestContext};
