//! Command-line parsing for the SED profile plotter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the fitting/plotting code. Defaults follow the
//! upstream analysis configuration of each driver mode.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_LON_BAND_WIDTH, FitModel};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sedc", version, about = "Gamma-ray sky-map SED fitting and plotting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// One figure per latitude stripe: overlay that stripe's longitude bands
    /// for a single dataset.
    Stripes(StripesArgs),
    /// One figure per sky region: overlay several datasets, plus the
    /// left-right difference of the first.
    Leftright(LeftrightArgs),
}

/// Options for stripe figures.
#[derive(Debug, Parser, Clone)]
pub struct StripesArgs {
    /// Dataset to plot.
    #[arg(short = 'd', long, default_value = "data")]
    pub dataset: String,

    /// First energy bin (inclusive) of the fit window.
    #[arg(long, default_value_t = 2)]
    pub bin_min: usize,

    /// One past the last energy bin of the fit window.
    #[arg(long, default_value_t = 20)]
    pub bin_max: usize,

    /// Energy-grid index of the normalization pivot E_ref.
    #[arg(long, default_value_t = 5)]
    pub e_ref_bin: usize,

    /// Spectral model overlaid on each longitude band.
    #[arg(long, value_enum, default_value_t = FitModel::PlawCut)]
    pub fit: FitModel,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options for left-right comparison figures.
#[derive(Debug, Parser, Clone)]
pub struct LeftrightArgs {
    /// Datasets to overlay, in order.
    #[arg(short = 'd', long = "dataset", default_values_t = [
        "data".to_string(),
        "lowE".to_string(),
        "GALPROP".to_string(),
        "boxes".to_string(),
    ])]
    pub datasets: Vec<String>,

    /// First energy bin (inclusive) of the fit window.
    #[arg(long, default_value_t = 0)]
    pub bin_min: usize,

    /// One past the last energy bin of the fit window.
    #[arg(long, default_value_t = 31)]
    pub bin_max: usize,

    /// Energy-grid index of the normalization pivot E_ref.
    #[arg(long, default_value_t = 15)]
    pub e_ref_bin: usize,

    /// Spectral model overlaid per dataset (disabled by default).
    #[arg(long, value_enum, default_value_t = FitModel::None)]
    pub fit: FitModel,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options shared by both modes.
#[derive(Debug, Parser, Clone)]
pub struct CommonArgs {
    /// Directory containing `dct_<dataset>.yaml` store files.
    #[arg(long, default_value = "dct")]
    pub input_dir: PathBuf,

    /// Output directory for rendered figures.
    #[arg(long, default_value = "plots")]
    pub plot_dir: PathBuf,

    /// Disable the left-right difference series.
    #[arg(long)]
    pub no_diff: bool,

    /// Angular width (degrees) shared by the longitude bands.
    #[arg(long, default_value_t = DEFAULT_LON_BAND_WIDTH)]
    pub lon_width: f64,

    /// Minimizer iteration cap.
    #[arg(long, default_value_t = 5000)]
    pub max_iters: u64,
}
