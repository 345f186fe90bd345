//! Spectral model implementations.
//!
//! Models are implemented as small, pure functions so the fitting code can
//! stay generic over the model kind.

pub mod spectrum;

pub use spectrum::*;
