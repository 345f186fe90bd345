//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments into an explicit [`RunConfig`]
//! - dispatches to the figure pipeline for the chosen mode
//! - lets fatal errors bubble up as exit codes

use clap::Parser;

use crate::cli::{Cli, Command, CommonArgs, LeftrightArgs, StripesArgs};
use crate::domain::{DEFAULT_LAT_BAND_WIDTHS, FitModel, FitOptions, FitWindow, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `sedc` binary.
pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Stripes(args) => pipeline::run_stripes(&stripes_config(&args)),
        Command::Leftright(args) => pipeline::run_leftright(&leftright_config(&args)),
    }
}

pub fn stripes_config(args: &StripesArgs) -> RunConfig {
    base_config(
        vec![args.dataset.clone()],
        args.bin_min,
        args.bin_max,
        args.e_ref_bin,
        args.fit,
        &args.common,
    )
}

pub fn leftright_config(args: &LeftrightArgs) -> RunConfig {
    base_config(
        args.datasets.clone(),
        args.bin_min,
        args.bin_max,
        args.e_ref_bin,
        args.fit,
        &args.common,
    )
}

fn base_config(
    datasets: Vec<String>,
    bin_min: usize,
    bin_max: usize,
    e_ref_bin: usize,
    fit: FitModel,
    common: &CommonArgs,
) -> RunConfig {
    RunConfig {
        datasets,
        input_dir: common.input_dir.clone(),
        plot_dir: common.plot_dir.clone(),
        window: FitWindow::new(bin_min, bin_max),
        e_ref_bin,
        fit_model: fit.kind(),
        plot_diff: !common.no_diff,
        lat_band_widths: DEFAULT_LAT_BAND_WIDTHS.to_vec(),
        lon_band_width: common.lon_width,
        fit_opts: FitOptions {
            max_iters: common.max_iters,
            ..FitOptions::default()
        },
    }
}
