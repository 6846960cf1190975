//! Plotters-powered SVG chart.
//!
//! Observed proportions are drawn as circles sized by group count with their
//! Wilson intervals; the true mean curve and the fitted curve (with its Wald
//! band) are line series on the same axes. A longevity-adjusted fit, when
//! present, is drawn as a second fitted line in green.

use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::domain::ComparisonRow;
use crate::error::AppError;

const CHART_SIZE: (u32, u32) = (900, 600);
const MIN_RADIUS: f64 = 2.0;
const MAX_RADIUS: f64 = 10.0;

/// Write an SVG chart of `rows` (and optionally `adjusted`) to `path`.
pub fn write_svg_chart(
    path: &Path,
    rows: &[ComparisonRow],
    adjusted: Option<&[ComparisonRow]>,
    title: &str,
) -> Result<(), AppError> {
    if rows.len() < 2 {
        return Err(AppError::new(2, "Need at least two ages to draw a chart."));
    }

    draw_chart(path, rows, adjusted, title)
        .map_err(|e| AppError::new(2, format!("Failed to write SVG '{}': {e}", path.display())))?;

    info!(path = %path.display(), "wrote SVG chart");
    Ok(())
}

fn draw_chart(
    path: &Path,
    rows: &[ComparisonRow],
    adjusted: Option<&[ComparisonRow]>,
    title: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let a_min = rows.iter().map(|r| r.age).min().unwrap_or(0);
    let a_max = rows.iter().map(|r| r.age).max().unwrap_or(1);
    let x0 = f64::from(a_min) - 0.5;
    let x1 = f64::from(a_max) + 0.5;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, 0.0f64..1.0f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Age (years)")
        .y_desc("P(reproduce)")
        .x_labels((a_max - a_min + 1) as usize)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    let n_max = rows.iter().map(|r| r.n).max().unwrap_or(1).max(1) as f64;
    let observed_color = RGBColor(70, 110, 200);
    let fitted_color = RGBColor(200, 60, 40);
    let adjusted_color = RGBColor(40, 150, 80);

    chart.draw_series(rows.iter().map(|r| {
        ErrorBar::new_vertical(
            f64::from(r.age),
            r.observed_lo,
            r.observed,
            r.observed_hi,
            observed_color.mix(0.6).stroke_width(1),
            6,
        )
    }))?;

    chart
        .draw_series(rows.iter().map(|r| {
            let radius = MIN_RADIUS + (MAX_RADIUS - MIN_RADIUS) * (r.n as f64 / n_max).sqrt();
            Circle::new(
                (f64::from(r.age), r.observed),
                radius.round() as i32,
                observed_color.mix(0.5).filled(),
            )
        }))?
        .label("observed (size ~ n)")
        .legend(move |(x, y)| Circle::new((x + 10, y), 4, observed_color.filled()));

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|r| (f64::from(r.age), r.true_prob)),
            BLACK.stroke_width(2),
        ))?
        .label("true mean")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|r| (f64::from(r.age), r.fitted)),
            fitted_color.stroke_width(2),
        ))?
        .label("fitted")
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], fitted_color.stroke_width(2))
        });

    if let Some(adjusted) = adjusted {
        chart
            .draw_series(LineSeries::new(
                adjusted.iter().map(|r| (f64::from(r.age), r.fitted)),
                adjusted_color.stroke_width(2),
            ))?
            .label("longevity-adjusted")
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], adjusted_color.stroke_width(2))
            });
    }

    for band in [
        rows.iter().map(|r| (f64::from(r.age), r.fitted_lo)).collect::<Vec<_>>(),
        rows.iter().map(|r| (f64::from(r.age), r.fitted_hi)).collect::<Vec<_>>(),
    ] {
        chart.draw_series(LineSeries::new(band, &fitted_color.mix(0.4)))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
