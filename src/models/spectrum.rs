//! Differential-flux prediction for the supported spectral shapes.
//!
//! Both shapes are normalized at a fixed pivot `E_ref` (an energy-grid value
//! chosen per run, never fitted):
//!
//! - power law:        `N0 * (E/E_ref)^(-Gamma)`
//! - with exp cutoff:  `N0 * (E/E_ref)^(-Gamma) * exp(-E/E_cut)`

use crate::domain::SpectralKind;

/// Predict the differential flux at energy `e`.
///
/// `params` is `[N0, Gamma]` for the plain power law and `[N0, Gamma, E_cut]`
/// for the cutoff variant.
///
/// # Panics
/// Panics if `params` is shorter than `kind.param_count()`. Callers should
/// size the parameter vector via `SpectralKind::param_count`.
pub fn flux(kind: SpectralKind, e: f64, e_ref: f64, params: &[f64]) -> f64 {
    match kind {
        SpectralKind::PowerLaw => params[0] * (e / e_ref).powf(-params[1]),
        SpectralKind::PlawExpCutoff => {
            params[0] * (e / e_ref).powf(-params[1]) * (-e / params[2]).exp()
        }
    }
}

/// Evaluate the fitted curve on an energy grid, for overlay rendering.
pub fn curve(kind: SpectralKind, energies: &[f64], e_ref: f64, params: &[f64]) -> Vec<(f64, f64)> {
    energies
        .iter()
        .map(|&e| (e, flux(kind, e, e_ref, params)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_law_is_n0_at_the_pivot() {
        let f = flux(SpectralKind::PowerLaw, 10.0, 10.0, &[3.5e-6, 2.4]);
        assert!((f - 3.5e-6).abs() < 1e-18);
    }

    #[test]
    fn power_law_halves_per_doubling_for_unit_index() {
        let f1 = flux(SpectralKind::PowerLaw, 2.0, 1.0, &[100.0, 1.0]);
        let f2 = flux(SpectralKind::PowerLaw, 4.0, 1.0, &[100.0, 1.0]);
        assert!((f1 - 50.0).abs() < 1e-12);
        assert!((f2 - 25.0).abs() < 1e-12);
    }

    #[test]
    fn cutoff_suppresses_relative_to_plain_law() {
        let plain = flux(SpectralKind::PowerLaw, 100.0, 1.0, &[1.0, 2.0]);
        let cut = flux(SpectralKind::PlawExpCutoff, 100.0, 1.0, &[1.0, 2.0, 50.0]);
        assert!((cut - plain * (-2.0_f64).exp()).abs() < 1e-15);
        assert!(cut < plain);
    }

    #[test]
    fn curve_pairs_energies_with_predictions() {
        let es = [1.0, 2.0, 4.0];
        let pts = curve(SpectralKind::PowerLaw, &es, 1.0, &[8.0, 1.0]);
        assert_eq!(pts, vec![(1.0, 8.0), (2.0, 4.0), (4.0, 2.0)]);
    }
}
