//! Shared figure pipeline used by both driver modes.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! store load -> sigma floor -> chi2 fit -> goodness-of-fit -> render.
//!
//! Each figure is processed to completion before the next (strictly
//! single-threaded); a failed fit skips that overlay with a warning and
//! never aborts the batch, while load/shape errors abort the run.

use log::{info, warn};

use crate::data::{DifferencePoint, FluxProfile, difference_series};
use crate::domain::{RunConfig, SpectralFit, SpectralKind, dataset_style, stripe_style};
use crate::error::AppError;
use crate::fit::{
    Chi2Objective, FitError, ReducedChi2, dof, fit_spectrum, initial_guess, reduced_chi2,
};
use crate::io::SkyMapStore;
use crate::models::spectrum;
use crate::plot::{CurveSeries, DiffSeries, ErrorBarSeries, FigureSpec, render_figure};
use crate::report;

/// A successful per-region fit: parameters, goodness-of-fit, and the curve
/// evaluated over the fit window for overlay.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub fit: SpectralFit,
    pub reduced: ReducedChi2,
    pub curve: Vec<(f64, f64)>,
}

/// Fit one (already floored) profile over the configured window.
pub fn fit_profile_window(
    energy: &[f64],
    profile: &FluxProfile,
    kind: SpectralKind,
    config: &RunConfig,
) -> Result<FitOutcome, FitError> {
    let window = &config.window;
    let x = window.slice(energy);
    let y = window.slice(&profile.values);
    let s = window.slice(&profile.sigmas);
    let e_ref = energy[config.e_ref_bin];

    let objective = Chi2Objective::new(x.to_vec(), y.to_vec(), s.to_vec(), e_ref, kind)?;
    let (init, steps) = initial_guess(kind, energy.len());
    let fit = fit_spectrum(objective, &init, &steps, &config.fit_opts)?;

    let reduced = reduced_chi2(fit.chi2_min, dof(window.width(), kind));
    let curve = spectrum::curve(kind, x, e_ref, &fit.params);
    Ok(FitOutcome { fit, reduced, curve })
}

/// Render one figure per latitude stripe of a single dataset.
pub fn run_stripes(config: &RunConfig) -> Result<(), AppError> {
    let dataset = config
        .datasets
        .first()
        .ok_or_else(|| AppError::config("No dataset given."))?;
    let store = load_store(config, dataset)?;
    ensure_plot_dir(config)?;

    for b in 0..store.n_lat() {
        let (fig, lines) = stripe_figure(&store, b, config);
        let name = stripe_figure_name(dataset, store.lat_centers[b]);
        let path = config.plot_dir.join(&name);
        render_figure(&path, &fig)?;

        let region = report::stripe_label(store.lat_centers[b], config.lat_width(b));
        print_figure_report(&name, &region, &lines);
        info!("plotted {}", path.display());
    }
    Ok(())
}

/// Render one figure per sky region, overlaying all configured datasets.
pub fn run_leftright(config: &RunConfig) -> Result<(), AppError> {
    if config.datasets.is_empty() {
        return Err(AppError::config("No datasets given."));
    }

    let mut stores = Vec::with_capacity(config.datasets.len());
    for name in &config.datasets {
        stores.push(load_store(config, name)?);
    }

    // The energy grid and region layout are shared across datasets; overlays
    // make no sense otherwise.
    let first = &stores[0];
    for other in &stores[1..] {
        if other.n_energy() != first.n_energy()
            || other.n_lat() != first.n_lat()
            || other.n_lon() != first.n_lon()
        {
            return Err(AppError::data(format!(
                "Dataset '{}' layout ({} lat, {} lon, {} energy bins) differs from '{}' ({}, {}, {}).",
                other.dataset,
                other.n_lat(),
                other.n_lon(),
                other.n_energy(),
                first.dataset,
                first.n_lat(),
                first.n_lon(),
                first.n_energy(),
            )));
        }
    }

    ensure_plot_dir(config)?;

    for b in 0..first.n_lat() {
        for l in 0..first.n_lon() {
            let (fig, lines) = leftright_figure(&stores, b, l, config);
            let name = leftright_figure_name(first.lon_centers[l], first.lat_centers[b]);
            let path = config.plot_dir.join(&name);
            render_figure(&path, &fig)?;

            let region = report::region_label(
                first.lon_centers[l],
                config.lon_band_width,
                first.lat_centers[b],
                config.lat_width(b),
            );
            print_figure_report(&name, &region, &lines);
            info!("plotted {}", path.display());
        }
    }
    Ok(())
}

/// Assemble the figure for latitude stripe `b`: one error-bar series per
/// longitude band, optional fit overlays, optional left-right difference.
pub fn stripe_figure(store: &SkyMapStore, b: usize, config: &RunConfig) -> (FigureSpec, Vec<String>) {
    let mut fig = FigureSpec {
        series: Vec::new(),
        curves: Vec::new(),
        diff: None,
        y_max: 4e-4,
    };
    let mut lines = Vec::new();
    let mut profiles = Vec::with_capacity(store.n_lon());

    for l in 0..store.n_lon() {
        let mut profile = store.profile(b, l);
        profile.floor_sigmas();

        let style = stripe_style(l);
        fig.series.push(error_bar_series(&store.energy_bins, &profile, style, false));

        if let Some(kind) = config.fit_model {
            let label = report::lon_label(store.lon_centers[l], config.lon_band_width);
            push_fit(
                &mut fig,
                &mut lines,
                fit_profile_window(&store.energy_bins, &profile, kind, config),
                &store.dataset,
                &label,
                style.color,
            );
        }

        profiles.push(profile);
    }

    if config.plot_diff && profiles.len() >= 2 {
        match difference_series(&profiles[0], &profiles[1]) {
            Ok(diff) => fig.diff = Some(diff_series(&store.energy_bins, &diff)),
            Err(err) => warn!(
                "skipping difference series for dataset '{}': {err}",
                store.dataset
            ),
        }
    }

    (fig, lines)
}

/// Assemble the figure for sky region `(b, l)`: one error-bar series per
/// dataset, optional fit overlays, and the first dataset's left-right
/// difference.
pub fn leftright_figure(
    stores: &[SkyMapStore],
    b: usize,
    l: usize,
    config: &RunConfig,
) -> (FigureSpec, Vec<String>) {
    // Narrow stripes near the plane carry more flux; widen the viewport.
    let y_max = if (config.lat_width(b) - 10.0).abs() < 1e-9 { 1e-4 } else { 1e-3 };
    let mut fig = FigureSpec {
        series: Vec::new(),
        curves: Vec::new(),
        diff: None,
        y_max,
    };
    let mut lines = Vec::new();

    for (i, store) in stores.iter().enumerate() {
        let mut profile = store.profile(b, l);
        profile.floor_sigmas();

        let style = dataset_style(i);
        fig.series.push(error_bar_series(&store.energy_bins, &profile, style, true));

        if let Some(kind) = config.fit_model {
            let label = store.dataset.clone();
            push_fit(
                &mut fig,
                &mut lines,
                fit_profile_window(&store.energy_bins, &profile, kind, config),
                &store.dataset,
                &label,
                style.color,
            );
        }
    }

    if config.plot_diff {
        let first = &stores[0];
        if first.n_lon() >= 2 {
            let mut left = first.profile(b, 0);
            let mut right = first.profile(b, 1);
            left.floor_sigmas();
            right.floor_sigmas();
            match difference_series(&left, &right) {
                Ok(diff) => fig.diff = Some(diff_series(&first.energy_bins, &diff)),
                Err(err) => warn!(
                    "skipping difference series for dataset '{}': {err}",
                    first.dataset
                ),
            }
        }
    }

    (fig, lines)
}

pub fn stripe_figure_name(dataset: &str, lat_center: f64) -> String {
    format!("SED_{dataset}_b={}.png", lat_center.trunc() as i64)
}

pub fn leftright_figure_name(lon_center: f64, lat_center: f64) -> String {
    format!(
        "SED_leftright_l={}_b={}.png",
        lon_center.trunc() as i64,
        lat_center.trunc() as i64
    )
}

fn push_fit(
    fig: &mut FigureSpec,
    lines: &mut Vec<String>,
    outcome: Result<FitOutcome, FitError>,
    dataset: &str,
    label: &str,
    color: (u8, u8, u8),
) {
    match outcome {
        Ok(outcome) => {
            if matches!(outcome.reduced, ReducedChi2::Underdetermined) {
                warn!(
                    "underdetermined fit for dataset '{dataset}' ({label}): chi2/dof omitted"
                );
            }
            lines.push(report::fit_summary(label, &outcome.fit, outcome.reduced));
            fig.curves.push(CurveSeries { points: outcome.curve, color });
        }
        Err(err) => {
            warn!("skipping fit overlay for dataset '{dataset}' ({label}): {err}");
            lines.push(report::skip_summary(label, &err));
        }
    }
}

fn error_bar_series(
    energy: &[f64],
    profile: &FluxProfile,
    style: crate::domain::DisplayStyle,
    connect: bool,
) -> ErrorBarSeries {
    ErrorBarSeries {
        points: energy
            .iter()
            .zip(&profile.values)
            .zip(&profile.sigmas)
            .map(|((&e, &v), &s)| (e, v, s))
            .collect(),
        style,
        connect,
    }
}

fn diff_series(energy: &[f64], diff: &[DifferencePoint]) -> DiffSeries {
    DiffSeries {
        points: diff
            .iter()
            .map(|d| (energy[d.bin], d.magnitude, d.sigma, d.positive))
            .collect(),
    }
}

fn load_store(config: &RunConfig, dataset: &str) -> Result<SkyMapStore, AppError> {
    let store = SkyMapStore::load(&config.store_path(dataset), dataset)?;
    config.window.validate(store.n_energy())?;
    if config.e_ref_bin >= store.n_energy() {
        return Err(AppError::config(format!(
            "Reference bin {} is outside the energy grid of dataset '{dataset}' ({} bins).",
            config.e_ref_bin,
            store.n_energy()
        )));
    }
    Ok(store)
}

fn ensure_plot_dir(config: &RunConfig) -> Result<(), AppError> {
    std::fs::create_dir_all(&config.plot_dir).map_err(|e| {
        AppError::config(format!(
            "Failed to create plot directory '{}': {e}",
            config.plot_dir.display()
        ))
    })
}

fn print_figure_report(name: &str, region: &str, lines: &[String]) {
    println!("{name}: {region}");
    for line in lines {
        println!("  {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DEFAULT_LAT_BAND_WIDTHS, DEFAULT_LON_BAND_WIDTH, FitOptions, FitWindow,
    };
    use crate::models::spectrum;

    fn power_law_store(dataset: &str) -> SkyMapStore {
        // Two longitude bands with exact power-law profiles (N0 = 100 / 200,
        // Gamma = 1) on the grid [1, 2, 4, 8, 16, 32].
        let energies: Vec<f64> = vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
        let lon0: Vec<f64> = energies
            .iter()
            .map(|&e| spectrum::flux(SpectralKind::PowerLaw, e, 1.0, &[100.0, 1.0]))
            .collect();
        let lon1: Vec<f64> = lon0.iter().map(|v| v * 2.0).collect();
        let sigmas = vec![1.0; energies.len()];

        SkyMapStore::from_parts(
            dataset,
            vec![-5.0, 5.0],
            vec![50.0],
            energies,
            vec![vec![lon0, lon1]],
            vec![vec![sigmas.clone(), sigmas]],
        )
        .unwrap()
    }

    fn test_config(fit_model: Option<SpectralKind>) -> RunConfig {
        RunConfig {
            datasets: vec!["data".to_string()],
            input_dir: "dct".into(),
            plot_dir: "plots".into(),
            window: FitWindow::new(0, 6),
            e_ref_bin: 0,
            fit_model,
            plot_diff: true,
            lat_band_widths: DEFAULT_LAT_BAND_WIDTHS.to_vec(),
            lon_band_width: DEFAULT_LON_BAND_WIDTH,
            fit_opts: FitOptions::default(),
        }
    }

    #[test]
    fn fit_profile_window_recovers_the_generating_law() {
        let store = power_law_store("data");
        let mut profile = store.profile(0, 0);
        profile.floor_sigmas();

        let config = test_config(Some(SpectralKind::PowerLaw));
        let outcome =
            fit_profile_window(&store.energy_bins, &profile, SpectralKind::PowerLaw, &config)
                .unwrap();

        assert!((outcome.fit.n0() - 100.0).abs() / 100.0 < 1e-4);
        assert!((outcome.fit.gamma() - 1.0).abs() < 1e-4);
        assert!(outcome.fit.chi2_min < 1e-8);
        assert!(matches!(outcome.reduced, ReducedChi2::Value(v) if v < 1e-8));
        assert_eq!(outcome.curve.len(), 6);
    }

    #[test]
    fn stripe_figure_overlays_each_longitude_band() {
        let store = power_law_store("data");
        let config = test_config(Some(SpectralKind::PowerLaw));

        let (fig, lines) = stripe_figure(&store, 0, &config);
        assert_eq!(fig.series.len(), 2);
        assert_eq!(fig.curves.len(), 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("chi2/dof=0.0"), "{}", lines[0]);

        // lon0 - lon1 is negative everywhere; magnitudes stay non-negative.
        let diff = fig.diff.expect("difference series");
        assert_eq!(diff.points.len(), 6);
        assert!(diff.points.iter().all(|p| !p.3 && p.1 > 0.0));
    }

    #[test]
    fn narrow_stripe_widens_the_leftright_viewport() {
        let store = power_law_store("data");
        let mut config = test_config(None);
        config.lat_band_widths = vec![4.0];

        let (fig, lines) = leftright_figure(std::slice::from_ref(&store), 0, 0, &config);
        assert_eq!(fig.y_max, 1e-3);
        assert!(fig.curves.is_empty());
        assert!(lines.is_empty());
        assert!(fig.diff.is_some());
    }

    #[test]
    fn failed_fit_skips_the_overlay_but_keeps_the_data() {
        let store = power_law_store("data");
        let mut config = test_config(Some(SpectralKind::PowerLaw));
        config.fit_opts = FitOptions {
            max_iters: 1,
            sd_tolerance: 1e-300,
        };

        let (fig, lines) = leftright_figure(std::slice::from_ref(&store), 0, 0, &config);
        assert_eq!(fig.series.len(), 1);
        assert!(fig.curves.is_empty());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("fit skipped"), "{}", lines[0]);
    }

    #[test]
    fn two_bin_window_reports_underdetermined() {
        let store = power_law_store("data");
        let mut config = test_config(Some(SpectralKind::PowerLaw));
        config.window = FitWindow::new(0, 2);

        let mut profile = store.profile(0, 0);
        profile.floor_sigmas();
        let outcome =
            fit_profile_window(&store.energy_bins, &profile, SpectralKind::PowerLaw, &config)
                .unwrap();
        assert!(matches!(outcome.reduced, ReducedChi2::Underdetermined));

        let line = report::fit_summary("data", &outcome.fit, outcome.reduced);
        assert!(line.contains("underdetermined"));
    }

    #[test]
    fn figure_names_encode_the_region() {
        assert_eq!(stripe_figure_name("data", 50.0), "SED_data_b=50.png");
        assert_eq!(leftright_figure_name(-5.0, -47.0), "SED_leftright_l=-5_b=-47.png");
    }
}
