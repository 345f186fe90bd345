//! Flux-profile handling: the data-quality sigma floor and the left-right
//! difference series.

pub mod profile;

pub use profile::*;
