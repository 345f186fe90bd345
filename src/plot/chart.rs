//! Log-log SED figure rendering.
//!
//! The renderer is intentionally data-driven: all series are assembled by the
//! pipeline, and this module only maps them onto a Plotters chart and writes
//! the PNG. Figures carry no on-canvas text (we build Plotters without its
//! native font stack); region identifiers are encoded in the file name and
//! fit parameters go to the terminal report.

use std::path::Path;

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::combinators::LogCoord;
use plotters::prelude::*;

use crate::domain::{DisplayStyle, MarkerKind};
use crate::error::AppError;

/// Fixed energy viewport (GeV), matching the processed sky maps.
pub const X_MIN: f64 = 1.0;
pub const X_MAX: f64 = 2e3;

/// Lower flux bound of the viewport.
pub const Y_MIN: f64 = 1e-8;

type SedChart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<LogCoord<f64>, LogCoord<f64>>>;

/// One dataset's (or longitude band's) raw profile with error bars.
#[derive(Debug, Clone)]
pub struct ErrorBarSeries {
    /// `(energy, flux, sigma)` triples over the full grid.
    pub points: Vec<(f64, f64, f64)>,
    pub style: DisplayStyle,
    /// Join consecutive points with a thin line.
    pub connect: bool,
}

/// A fitted-curve overlay.
#[derive(Debug, Clone)]
pub struct CurveSeries {
    pub points: Vec<(f64, f64)>,
    pub color: (u8, u8, u8),
}

/// Left-right difference series: `(energy, magnitude, sigma, positive)`.
/// The sign only selects the marker treatment; magnitudes are non-negative.
#[derive(Debug, Clone)]
pub struct DiffSeries {
    pub points: Vec<(f64, f64, f64, bool)>,
}

/// Everything drawn on one figure.
#[derive(Debug, Clone)]
pub struct FigureSpec {
    pub series: Vec<ErrorBarSeries>,
    pub curves: Vec<CurveSeries>,
    pub diff: Option<DiffSeries>,
    /// Upper flux bound; the original widens it for narrow latitude stripes.
    pub y_max: f64,
}

const DIFF_POSITIVE: DisplayStyle = DisplayStyle {
    color: (105, 105, 105),
    marker: MarkerKind::TriangleRight,
    marker_size: 4,
};
const DIFF_NEGATIVE: DisplayStyle = DisplayStyle {
    color: (211, 211, 211),
    marker: MarkerKind::TriangleRight,
    marker_size: 3,
};

/// Render one figure to `path`.
pub fn render_figure(path: &Path, fig: &FigureSpec) -> Result<(), AppError> {
    let y_max = if fig.y_max > Y_MIN { fig.y_max } else { 1e-4 };

    let root = BitMapBackend::new(path, (900, 640)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_err(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d((X_MIN..X_MAX).log_scale(), (Y_MIN..y_max).log_scale())
        .map_err(|e| render_err(path, e))?;

    // Fitted overlays go underneath the data points.
    for curve in &fig.curves {
        let color = rgb(curve.color);
        let pts: Vec<(f64, f64)> = curve
            .points
            .iter()
            .copied()
            .filter(|&(x, y)| in_view(x, y, y_max))
            .collect();
        chart
            .draw_series(LineSeries::new(pts, color.stroke_width(2)))
            .map_err(|e| render_err(path, e))?;
    }

    for series in &fig.series {
        draw_error_bar_series(&mut chart, path, series, y_max)?;
    }

    if let Some(diff) = &fig.diff {
        for (style, positive) in [(DIFF_POSITIVE, true), (DIFF_NEGATIVE, false)] {
            let subset = ErrorBarSeries {
                points: diff
                    .points
                    .iter()
                    .filter(|p| p.3 == positive)
                    .map(|&(e, m, s, _)| (e, m, s))
                    .collect(),
                style,
                connect: false,
            };
            draw_error_bar_series(&mut chart, path, &subset, y_max)?;
        }
    }

    root.present().map_err(|e| render_err(path, e))?;
    Ok(())
}

fn draw_error_bar_series(
    chart: &mut SedChart<'_, '_>,
    path: &Path,
    series: &ErrorBarSeries,
    y_max: f64,
) -> Result<(), AppError> {
    let color = rgb(series.style.color);

    // Log axes cannot place non-positive or out-of-view fluxes; drop them the
    // way the original viewport clipped them.
    let visible: Vec<(f64, f64, f64)> = series
        .points
        .iter()
        .copied()
        .filter(|&(x, y, _)| in_view(x, y, y_max))
        .collect();

    if series.connect && visible.len() > 1 {
        chart
            .draw_series(LineSeries::new(
                visible.iter().map(|&(x, y, _)| (x, y)),
                color.stroke_width(1),
            ))
            .map_err(|e| render_err(path, e))?;
    }

    chart
        .draw_series(visible.iter().map(|&(x, y, s)| {
            let lo = (y - s).max(Y_MIN);
            let hi = (y + s).min(y_max);
            ErrorBar::new_vertical(x, lo, y, hi, color.stroke_width(1), 5)
        }))
        .map_err(|e| render_err(path, e))?;

    draw_markers(chart, path, &visible, series.style)
}

fn draw_markers(
    chart: &mut SedChart<'_, '_>,
    path: &Path,
    points: &[(f64, f64, f64)],
    style: DisplayStyle,
) -> Result<(), AppError> {
    let fill: ShapeStyle = rgb(style.color).filled();
    let sz = style.marker_size;

    match style.marker {
        MarkerKind::Circle => chart.draw_series(
            points
                .iter()
                .map(|&(x, y, _)| EmptyElement::at((x, y)) + Circle::new((0, 0), sz, fill)),
        ),
        MarkerKind::Square => chart.draw_series(points.iter().map(|&(x, y, _)| {
            EmptyElement::at((x, y)) + Rectangle::new([(-sz, -sz), (sz, sz)], fill)
        })),
        MarkerKind::Diamond => chart.draw_series(points.iter().map(|&(x, y, _)| {
            EmptyElement::at((x, y))
                + Polygon::new(vec![(0, -sz), (sz, 0), (0, sz), (-sz, 0)], fill)
        })),
        MarkerKind::TriangleLeft => chart.draw_series(points.iter().map(|&(x, y, _)| {
            EmptyElement::at((x, y)) + Polygon::new(vec![(-sz, 0), (sz, -sz), (sz, sz)], fill)
        })),
        MarkerKind::TriangleRight => chart.draw_series(points.iter().map(|&(x, y, _)| {
            EmptyElement::at((x, y)) + Polygon::new(vec![(sz, 0), (-sz, -sz), (-sz, sz)], fill)
        })),
    }
    .map_err(|e| render_err(path, e))?;

    Ok(())
}

fn in_view(x: f64, y: f64, y_max: f64) -> bool {
    x.is_finite() && y.is_finite() && x >= X_MIN && x <= X_MAX && y >= Y_MIN && y <= y_max
}

fn rgb(c: (u8, u8, u8)) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

fn render_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::render(format!("Failed to render '{}': {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset_style;

    #[test]
    fn renders_a_png_with_all_series_kinds() {
        let fig = FigureSpec {
            series: vec![ErrorBarSeries {
                points: vec![(1.0, 1e-5, 2e-6), (10.0, 1e-6, 2e-7), (100.0, 1e-7, 5e-8)],
                style: dataset_style(0),
                connect: true,
            }],
            curves: vec![CurveSeries {
                points: vec![(1.0, 1e-5), (10.0, 1e-6), (100.0, 1e-7)],
                color: (0, 0, 0),
            }],
            diff: Some(DiffSeries {
                points: vec![(1.0, 2e-6, 1e-6, true), (10.0, 3e-7, 1e-7, false)],
            }),
            y_max: 1e-4,
        };

        let path = std::env::temp_dir().join("sed_curves_render_smoke.png");
        render_figure(&path, &fig).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn non_positive_fluxes_are_dropped_not_fatal() {
        let fig = FigureSpec {
            series: vec![ErrorBarSeries {
                points: vec![(1.0, -1e-6, 1e-7), (10.0, 0.0, 1e-7), (100.0, 1e-6, 1e-7)],
                style: dataset_style(1),
                connect: false,
            }],
            curves: vec![],
            diff: None,
            y_max: 1e-4,
        };

        let path = std::env::temp_dir().join("sed_curves_render_clip.png");
        render_figure(&path, &fig).unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
