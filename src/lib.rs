//! `sed-curves` library crate.
//!
//! The binary (`sedc`) is a thin wrapper around this library so that:
//!
//! - core logic (objective, fitter, goodness-of-fit) is testable without
//!   spawning processes
//! - modules are reusable (e.g., future batch drivers or notebooks)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod models;
pub mod plot;
pub mod report;
