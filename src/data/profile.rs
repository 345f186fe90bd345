//! Per-region flux profiles.
//!
//! A profile is one (dataset, latitude-band, longitude-band) slice of the
//! store: a flux value and a standard deviation per energy bin.

use crate::error::AppError;

/// Standard deviations at or below this are treated as "statistically
/// unconstrained" rather than "zero uncertainty".
pub const SIGMA_DEGENERATE_THRESHOLD: f64 = 1e-29;

/// Replacement value for degenerate standard deviations. Keeps the objective
/// from assigning infinite weight to those bins.
pub const SIGMA_FLOOR: f64 = 1e-7;

/// Differential flux and standard deviation per energy-grid bin for one sky
/// region. Invariant (checked at store load): both arrays have exactly the
/// energy-grid length.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxProfile {
    pub values: Vec<f64>,
    pub sigmas: Vec<f64>,
}

impl FluxProfile {
    /// Apply the data-quality floor to this profile's standard deviations.
    pub fn floor_sigmas(&mut self) {
        floor_sigmas(&mut self.sigmas);
    }
}

/// Replace each sigma at or below [`SIGMA_DEGENERATE_THRESHOLD`] with exactly
/// [`SIGMA_FLOOR`]; values above the threshold are left unchanged.
///
/// This intentionally discards genuine zero-uncertainty information; the
/// behavior is preserved for compatibility with the upstream pipeline.
pub fn floor_sigmas(sigmas: &mut [f64]) {
    for s in sigmas.iter_mut() {
        if *s <= SIGMA_DEGENERATE_THRESHOLD {
            *s = SIGMA_FLOOR;
        }
    }
}

/// One bin of the left-right difference series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferencePoint {
    pub bin: usize,
    /// `|flux_left - flux_right|`; always plotted non-negative.
    pub magnitude: f64,
    /// Combined uncertainty `sqrt(sigma_left^2 + sigma_right^2)`.
    pub sigma: f64,
    /// Sign of the raw difference; selects the marker treatment only.
    pub positive: bool,
}

/// Elementwise difference between two paired regions' profiles.
pub fn difference_series(
    left: &FluxProfile,
    right: &FluxProfile,
) -> Result<Vec<DifferencePoint>, AppError> {
    if left.values.len() != right.values.len() {
        return Err(AppError::data(format!(
            "Difference series length mismatch: {} vs {} bins.",
            left.values.len(),
            right.values.len()
        )));
    }

    let mut out = Vec::with_capacity(left.values.len());
    for bin in 0..left.values.len() {
        let diff = left.values[bin] - right.values[bin];
        let sigma = left.sigmas[bin].hypot(right.sigmas[bin]);
        out.push(DifferencePoint {
            bin,
            magnitude: diff.abs(),
            sigma,
            positive: diff >= 0.0,
        });
    }
    Ok(out)
}
