//! Figure rendering (Plotters bitmap backend).

pub mod chart;

pub use chart::*;
