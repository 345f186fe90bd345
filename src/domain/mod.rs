//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the spectral model kinds and their parameter vectors
//! - the fit window / optimizer settings
//! - the resolved run configuration (derived from CLI flags)
//! - display styles for rendered series

pub mod types;

pub use types::*;
