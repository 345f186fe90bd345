//! Curve fitting: chi-squared objective, minimizer, goodness-of-fit.
//!
//! Responsibilities:
//!
//! - bind one region's windowed (x, y, sigma) arrays and a spectral model
//!   into a scalar objective ([`objective`])
//! - minimize it deterministically with a Nelder–Mead simplex ([`fitter`])
//! - compute degrees of freedom and reduced chi-squared ([`goodness`])
//!
//! Failures here are scoped to a single (dataset, region) pair: the pipeline
//! skips that overlay and moves on, it never aborts the batch.

pub mod fitter;
pub mod goodness;
pub mod objective;

pub use fitter::*;
pub use goodness::*;
pub use objective::*;

/// Region-scoped fit failure.
///
/// Unlike [`crate::error::AppError`], these are recoverable: the caller
/// reports the skip and continues with the next region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FitError {
    /// Objective inputs are unusable (length mismatch, empty window,
    /// invalid reference energy, bad guess vector).
    InvalidInput(String),
    /// A standard deviation is non-positive even after floor substitution.
    DegenerateUncertainty { bin: usize },
    /// The minimizer exhausted its iteration budget before meeting the
    /// simplex tolerance.
    NotConverged { iters: u64 },
    /// Converged parameters or objective value are non-finite.
    NonFinite,
    /// The solver itself reported an error.
    Solver(String),
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::InvalidInput(msg) => write!(f, "invalid fit input: {msg}"),
            FitError::DegenerateUncertainty { bin } => {
                write!(f, "non-positive standard deviation at window bin {bin}")
            }
            FitError::NotConverged { iters } => {
                write!(f, "minimizer did not converge within {iters} iterations")
            }
            FitError::NonFinite => write!(f, "minimizer produced non-finite parameters"),
            FitError::Solver(msg) => write!(f, "solver error: {msg}"),
        }
    }
}

impl std::error::Error for FitError {}
