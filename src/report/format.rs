//! Formatted terminal output.
//!
//! The rendered figures carry no on-canvas text, so the per-figure report
//! line is the authoritative record of which region was plotted and what the
//! fit found.

use crate::domain::SpectralFit;
use crate::fit::ReducedChi2;

/// Angular extent of one sky region, e.g. `l in (-10, 0) deg, b in (50, 60) deg`.
pub fn region_label(lon_center: f64, lon_width: f64, lat_center: f64, lat_width: f64) -> String {
    format!(
        "{}, {}",
        band_label("l", lon_center, lon_width),
        band_label("b", lat_center, lat_width)
    )
}

/// Angular extent of one latitude stripe.
pub fn stripe_label(lat_center: f64, lat_width: f64) -> String {
    band_label("b", lat_center, lat_width)
}

/// Angular extent of one longitude band.
pub fn lon_label(lon_center: f64, lon_width: f64) -> String {
    band_label("l", lon_center, lon_width)
}

fn band_label(axis: &str, center: f64, width: f64) -> String {
    format!(
        "{axis} in ({:.0}, {:.0}) deg",
        center - width / 2.0,
        center + width / 2.0
    )
}

/// One fit-summary line, e.g.
/// `data: power law N0=1.234e-6, Gamma=2.41, chi2/dof=1.3`.
///
/// An underdetermined fit omits the statistic instead of printing a number.
pub fn fit_summary(label: &str, fit: &SpectralFit, reduced: ReducedChi2) -> String {
    let mut out = format!(
        "{label}: {} N0={:.3e}, Gamma={:.2}",
        fit.kind.display_name(),
        fit.n0(),
        fit.gamma()
    );
    if let Some(e_cut) = fit.e_cut() {
        out.push_str(&format!(", E_cut={e_cut:.1e}"));
    }
    match reduced {
        ReducedChi2::Value(v) => out.push_str(&format!(", chi2/dof={v:.1}")),
        ReducedChi2::Underdetermined => out.push_str(", chi2/dof=n/a (underdetermined)"),
    }
    out
}

/// One skip line for a fit that failed, naming the dataset and region.
pub fn skip_summary(label: &str, reason: &impl std::fmt::Display) -> String {
    format!("{label}: fit skipped ({reason})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SpectralFit, SpectralKind};

    #[test]
    fn region_label_spans_the_band_widths() {
        let label = region_label(-5.0, 10.0, 55.0, 10.0);
        assert_eq!(label, "l in (-10, 0) deg, b in (50, 60) deg");
    }

    #[test]
    fn fit_summary_includes_reduced_chi2_when_determined() {
        let fit = SpectralFit {
            kind: SpectralKind::PowerLaw,
            params: vec![1.2e-6, 2.41],
            chi2_min: 10.4,
        };
        let line = fit_summary("data", &fit, ReducedChi2::Value(1.3));
        assert!(line.contains("Gamma=2.41"));
        assert!(line.contains("chi2/dof=1.3"));
        assert!(!line.contains("E_cut"));
    }

    #[test]
    fn fit_summary_omits_the_statistic_when_underdetermined() {
        let fit = SpectralFit {
            kind: SpectralKind::PlawExpCutoff,
            params: vec![1.0, 2.0, 5e7],
            chi2_min: 0.2,
        };
        let line = fit_summary("lowE", &fit, ReducedChi2::Underdetermined);
        assert!(line.contains("E_cut=5.0e7"));
        assert!(line.contains("underdetermined"));
        assert!(!line.contains("chi2/dof=0"));
    }
}
