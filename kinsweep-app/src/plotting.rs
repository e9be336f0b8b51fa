//! Charts drawn from a combined table.

use anyhow::{bail, Result};
use plotters::prelude::*;
use std::path::Path;

/// Axis labels and caption of a chart.
pub struct ChartLabels<'a> {
    pub caption: &'a str,
    pub x: &'a str,
    pub y: &'a str,
}

fn padded_range(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        let pad = if max == 0.0 { 1.0 } else { max.abs() * 0.1 };
        return (min - pad, max + pad);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

/// Draws `points` as a line with markers. With `log_x` the x axis is logarithmic and
/// points with a non-positive x are left out.
pub fn plot_line(
    path: &Path,
    labels: &ChartLabels,
    points: &[(f64, f64)],
    log_x: bool,
) -> Result<()> {
    let data: Vec<(f64, f64)> = if log_x {
        points
            .iter()
            .filter(|(x, _)| *x > 0.0)
            .map(|(x, y)| (x.log10(), *y))
            .collect()
    } else {
        points.to_vec()
    };
    if data.is_empty() {
        bail!("Nothing to plot for '{}'", labels.y);
    }

    let (x_min, x_max) = padded_range(data.iter().map(|p| p.0));
    let (y_min, y_max) = padded_range(data.iter().map(|p| p.1));

    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.caption, ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let log_formatter = |v: &f64| format!("{:.2e}", 10f64.powf(*v));
    let plain_formatter = |v: &f64| format!("{}", v);
    let x_formatter: &dyn Fn(&f64) -> String = if log_x {
        &log_formatter
    } else {
        &plain_formatter
    };

    chart
        .configure_mesh()
        .x_desc(labels.x)
        .y_desc(labels.y)
        .x_label_formatter(x_formatter)
        .draw()?;

    chart
        .draw_series(LineSeries::new(data.iter().copied(), &BLUE))?
        .label(labels.y)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.filled()));
    chart.draw_series(
        data.iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Draws one bar per `(label, value)` pair, in order.
pub fn plot_bars(path: &Path, labels: &ChartLabels, bars: &[(String, f64)]) -> Result<()> {
    if bars.is_empty() {
        bail!("Nothing to plot for '{}'", labels.caption);
    }

    let top = bars.iter().map(|b| b.1).fold(0.0, f64::max);
    let bottom = bars.iter().map(|b| b.1).fold(0.0, f64::min);
    let top = if top == bottom { bottom + 1.0 } else { top * 1.1 };

    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.caption, ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..bars.len()).into_segmented(), bottom..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(labels.x)
        .y_desc(labels.y)
        .x_labels(bars.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                bars.get(*i).map(|b| b.0.clone()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(10)
            .data(bars.iter().enumerate().map(|(i, b)| (i, b.1))),
    )?;

    root.present()?;
    Ok(())
}
