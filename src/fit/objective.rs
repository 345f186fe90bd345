//! Chi-squared objective over a windowed flux profile.
//!
//! The objective owns immutable copies of the windowed arrays (energies,
//! flux values, standard deviations) plus the model kind and pivot energy,
//! and exposes a pure evaluation method over the free parameters. The
//! minimizer consumes it through `argmin`'s `CostFunction` trait.

use argmin::core::{CostFunction, Error as ArgminError};

use crate::domain::SpectralKind;
use crate::fit::FitError;
use crate::models::spectrum;

/// Cost returned for parameter points outside the model's domain (non-finite
/// entries, cutoff energy collapsing toward zero). Large but finite, so the
/// simplex retreats instead of overflowing.
pub const PENALTY_COST: f64 = 1e99;

/// Lower bound keeping `E_cut` away from zero; below it `exp(-E/E_cut)`
/// underflows or blows up for negative values.
const E_CUT_MIN: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct Chi2Objective {
    x: Vec<f64>,
    y: Vec<f64>,
    sigma: Vec<f64>,
    e_ref: f64,
    kind: SpectralKind,
}

impl Chi2Objective {
    /// Bind windowed arrays into an objective.
    ///
    /// The standard deviations are expected to have gone through the
    /// data-quality floor already; any remaining non-positive entry is a
    /// degenerate-uncertainty error.
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        sigma: Vec<f64>,
        e_ref: f64,
        kind: SpectralKind,
    ) -> Result<Self, FitError> {
        if x.len() != y.len() || x.len() != sigma.len() {
            return Err(FitError::InvalidInput(format!(
                "x/y/sigma lengths differ: {}/{}/{}",
                x.len(),
                y.len(),
                sigma.len()
            )));
        }
        if x.is_empty() {
            return Err(FitError::InvalidInput("empty fit window".to_string()));
        }
        if !e_ref.is_finite() || e_ref <= 0.0 {
            return Err(FitError::InvalidInput(format!(
                "reference energy must be positive, got {e_ref}"
            )));
        }
        if let Some(bin) = sigma.iter().position(|s| !s.is_finite() || *s <= 0.0) {
            return Err(FitError::DegenerateUncertainty { bin });
        }

        Ok(Self { x, y, sigma, e_ref, kind })
    }

    pub fn kind(&self) -> SpectralKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// `sum_i ((y_i - model(x_i; params)) / sigma_i)^2`.
    ///
    /// Pure: two calls with identical parameters return identical values.
    pub fn value(&self, params: &[f64]) -> f64 {
        if params.len() != self.kind.param_count()
            || params.iter().any(|p| !p.is_finite())
        {
            return PENALTY_COST;
        }
        if self.kind == SpectralKind::PlawExpCutoff && params[2] < E_CUT_MIN {
            return PENALTY_COST;
        }

        let mut chi2 = 0.0;
        for i in 0..self.x.len() {
            let model = spectrum::flux(self.kind, self.x[i], self.e_ref, params);
            let r = (self.y[i] - model) / self.sigma[i];
            chi2 += r * r;
        }

        if chi2.is_finite() { chi2 } else { PENALTY_COST }
    }
}

impl CostFunction for Chi2Objective {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(self.value(params))
    }
}
