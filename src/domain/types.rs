//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be used
//! in-memory during fitting and passed around between the pipeline, the
//! report formatter, and the renderer without conversion layers.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Natural-log spacing between consecutive energy-grid bins (~3 bins per
/// decade). Grids deviating from this are accepted with a warning; the
/// constant documents the nominal layout of the processed sky maps.
pub const LOG_BIN_SPACING: f64 = 0.346573590092441;

/// Angular width (degrees) shared by all longitude bands.
pub const DEFAULT_LON_BAND_WIDTH: f64 = 10.0;

/// Per-band angular widths (degrees) of the latitude stripes. The narrow 4°
/// stripes straddle the Galactic plane.
pub const DEFAULT_LAT_BAND_WIDTHS: [f64; 15] = [
    10.0, 10.0, 10.0, 10.0, 10.0, 4.0, 4.0, 4.0, 4.0, 4.0, 10.0, 10.0, 10.0, 10.0, 10.0,
];

/// Spectral model evaluated against a flux profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralKind {
    /// `N0 * (E/E_ref)^(-Gamma)`
    PowerLaw,
    /// `N0 * (E/E_ref)^(-Gamma) * exp(-E/E_cut)`
    PlawExpCutoff,
}

impl SpectralKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            SpectralKind::PowerLaw => "power law",
            SpectralKind::PlawExpCutoff => "power law + exp cutoff",
        }
    }

    /// Number of free parameters (`[N0, Gamma]` or `[N0, Gamma, E_cut]`).
    pub fn param_count(self) -> usize {
        match self {
            SpectralKind::PowerLaw => 2,
            SpectralKind::PlawExpCutoff => 3,
        }
    }
}

/// CLI-facing fit model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitModel {
    /// Plot raw profiles only, no fitted overlay.
    None,
    /// Plain power law.
    Plaw,
    /// Power law with exponential cutoff.
    PlawCut,
}

impl FitModel {
    pub fn kind(self) -> Option<SpectralKind> {
        match self {
            FitModel::None => None,
            FitModel::Plaw => Some(SpectralKind::PowerLaw),
            FitModel::PlawCut => Some(SpectralKind::PlawExpCutoff),
        }
    }
}

/// Contiguous energy-bin window `[bin_min, bin_max)` the objective is
/// evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitWindow {
    pub bin_min: usize,
    pub bin_max: usize,
}

impl FitWindow {
    pub fn new(bin_min: usize, bin_max: usize) -> Self {
        Self { bin_min, bin_max }
    }

    pub fn width(&self) -> usize {
        self.bin_max.saturating_sub(self.bin_min)
    }

    /// Validate the window against the loaded energy grid.
    pub fn validate(&self, n_energy: usize) -> Result<(), AppError> {
        if self.bin_min >= self.bin_max {
            return Err(AppError::config(format!(
                "Invalid fit window: bin_min={} must be < bin_max={}.",
                self.bin_min, self.bin_max
            )));
        }
        if self.bin_max > n_energy {
            return Err(AppError::config(format!(
                "Fit window [{}, {}) exceeds the energy grid ({n_energy} bins).",
                self.bin_min, self.bin_max
            )));
        }
        Ok(())
    }

    /// Restrict a full-grid array to the window.
    ///
    /// # Panics
    /// Panics if the window exceeds `values.len()`; call `validate` first.
    pub fn slice<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        &values[self.bin_min..self.bin_max]
    }
}

/// Minimizer settings.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Iteration cap; exhausting it without meeting the tolerance is reported
    /// as a convergence failure.
    pub max_iters: u64,
    /// Simplex standard-deviation tolerance on the objective values.
    pub sd_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iters: 5000,
            sd_tolerance: 1e-12,
        }
    }
}

/// Marker shape drawn at each data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Square,
    Circle,
    Diamond,
    TriangleLeft,
    TriangleRight,
}

/// Per-series display style (kept free of renderer types so the domain does
/// not depend on the plotting backend).
#[derive(Debug, Clone, Copy)]
pub struct DisplayStyle {
    pub color: (u8, u8, u8),
    pub marker: MarkerKind,
    pub marker_size: i32,
}

const BLACK: (u8, u8, u8) = (0, 0, 0);
const BLUE: (u8, u8, u8) = (0, 0, 255);
const RED: (u8, u8, u8) = (255, 0, 0);
const GREEN: (u8, u8, u8) = (0, 128, 0);

/// Style palette for overlaid datasets (left-right mode), in overlay order.
pub const DATASET_STYLES: [DisplayStyle; 4] = [
    DisplayStyle { color: BLACK, marker: MarkerKind::Square, marker_size: 4 },
    DisplayStyle { color: BLUE, marker: MarkerKind::Circle, marker_size: 4 },
    DisplayStyle { color: RED, marker: MarkerKind::Diamond, marker_size: 4 },
    DisplayStyle { color: GREEN, marker: MarkerKind::TriangleLeft, marker_size: 4 },
];

/// Style for the i-th overlaid dataset (cycles past the palette end).
pub fn dataset_style(index: usize) -> DisplayStyle {
    DATASET_STYLES[index % DATASET_STYLES.len()]
}

/// Style for the i-th longitude band of a stripe figure (stripes mode).
pub fn stripe_style(index: usize) -> DisplayStyle {
    const COLORS: [(u8, u8, u8); 4] = [BLUE, RED, BLACK, GREEN];
    DisplayStyle {
        color: COLORS[index % COLORS.len()],
        marker: MarkerKind::Square,
        marker_size: 3,
    }
}

/// Best-fit spectral parameters for one (dataset, region) pair, together
/// with the objective's value at convergence. Never persisted; lives only
/// for the duration of rendering one figure.
#[derive(Debug, Clone)]
pub struct SpectralFit {
    pub kind: SpectralKind,
    /// `[N0, Gamma]` or `[N0, Gamma, E_cut]` depending on `kind`.
    pub params: Vec<f64>,
    pub chi2_min: f64,
}

impl SpectralFit {
    pub fn n0(&self) -> f64 {
        self.params[0]
    }

    pub fn gamma(&self) -> f64 {
        self.params[1]
    }

    pub fn e_cut(&self) -> Option<f64> {
        match self.kind {
            SpectralKind::PowerLaw => None,
            SpectralKind::PlawExpCutoff => Some(self.params[2]),
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults); the core functions take it
/// explicitly instead of reading module-level state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Dataset names, in overlay order. Stripes mode uses only the first.
    pub datasets: Vec<String>,
    /// Directory containing `dct_<dataset>.yaml` store files.
    pub input_dir: PathBuf,
    /// Output directory for rendered images.
    pub plot_dir: PathBuf,
    pub window: FitWindow,
    /// Energy-grid index of the normalization pivot `E_ref`.
    pub e_ref_bin: usize,
    /// `None` disables the fitted overlay.
    pub fit_model: Option<SpectralKind>,
    /// Render the left-right difference series.
    pub plot_diff: bool,
    pub lat_band_widths: Vec<f64>,
    pub lon_band_width: f64,
    pub fit_opts: FitOptions,
}

impl RunConfig {
    /// Angular width of latitude band `b` (falls back to 10° when the store
    /// has more bands than the configured width list).
    pub fn lat_width(&self, b: usize) -> f64 {
        self.lat_band_widths.get(b).copied().unwrap_or(10.0)
    }

    /// Path of the store file for `dataset`.
    pub fn store_path(&self, dataset: &str) -> PathBuf {
        self.input_dir.join(format!("dct_{dataset}.yaml"))
    }
}
