//! Store loading.
//!
//! The on-disk dictionary format is treated as an opaque key-value store
//! producing nested numeric arrays; this module only validates shapes and
//! hands out per-region profiles.

pub mod store;

pub use store::*;
