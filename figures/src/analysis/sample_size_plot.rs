use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::analysis::export::Figure;
use crate::analysis::statistics::FiveNumberSummary;
use crate::models::{drawing_err, FigureError, FigureResult};

/// Half of the violin's widest extent, in category-axis units.
const HALF_WIDTH: f64 = 0.4;
const JITTER: f64 = 0.1;
const JITTER_SEED: u64 = 42;
/// The density is evaluated this many bandwidths past the data.
const CUT: f64 = 2.0;
const GRID_POINTS: usize = 128;
const LABEL_X: f64 = 0.62;

/// Violin of sample sizes on a log axis with every study as a jittered dot
/// and the five-number summary written beside it.
#[derive(Debug, Clone)]
pub struct SampleSizeFigure {
    pub summary: FiveNumberSummary,
    outline: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    value_range: (f64, f64),
}

impl SampleSizeFigure {
    pub fn new(values: &[f64]) -> FigureResult<Self> {
        if let Some(&bad) = values.iter().find(|&&v| !(v.is_finite() && v > 0.0)) {
            return Err(FigureError::NonPositiveValue(bad));
        }
        let summary = FiveNumberSummary::from_values(values)
            .ok_or_else(|| FigureError::EmptySeries("sample sizes".to_string()))?;

        let logs: Vec<f64> = values.iter().map(|v| v.log10()).collect();
        let bandwidth = scott_bandwidth(&logs);
        let lo = summary.minimum.log10() - CUT * bandwidth;
        let hi = summary.maximum.log10() + CUT * bandwidth;

        let grid: Vec<f64> = (0..GRID_POINTS)
            .map(|i| lo + (hi - lo) * i as f64 / (GRID_POINTS - 1) as f64)
            .collect();
        let density: Vec<f64> = grid.iter().map(|&t| gaussian_kde(&logs, bandwidth, t)).collect();
        let peak = density.iter().cloned().fold(f64::MIN_POSITIVE, f64::max);

        // Right edge upwards, then left edge back down.
        let mut outline: Vec<(f64, f64)> = grid
            .iter()
            .zip(&density)
            .map(|(&t, &d)| (HALF_WIDTH * d / peak, 10f64.powf(t)))
            .collect();
        outline.extend(
            grid.iter()
                .zip(&density)
                .rev()
                .map(|(&t, &d)| (-HALF_WIDTH * d / peak, 10f64.powf(t))),
        );

        let mut rng = StdRng::seed_from_u64(JITTER_SEED);
        let points = values
            .iter()
            .map(|&v| (rng.gen_range(-JITTER..JITTER), v))
            .collect();

        Ok(Self {
            summary,
            outline,
            points,
            value_range: (10f64.powf(lo), 10f64.powf(hi)),
        })
    }

    pub fn log_summary(&self) {
        for (label, value) in self.summary.entries() {
            info!("{label}: {value}");
        }
    }

    pub fn outline(&self) -> &[(f64, f64)] {
        &self.outline
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn value_range(&self) -> (f64, f64) {
        self.value_range
    }
}

/// Scott's rule on the sample standard deviation; a flat sample falls back to
/// a tenth of a decade.
fn scott_bandwidth(xs: &[f64]) -> f64 {
    let n = xs.len() as f64;
    if xs.len() < 2 {
        return 0.1;
    }
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let bw = var.sqrt() * n.powf(-0.2);
    if bw.is_finite() && bw > 0.0 {
        bw
    } else {
        0.1
    }
}

fn gaussian_kde(xs: &[f64], bandwidth: f64, t: f64) -> f64 {
    let norm = xs.len() as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt();
    xs.iter()
        .map(|x| (-0.5 * ((t - x) / bandwidth).powi(2)).exp())
        .sum::<f64>()
        / norm
}

impl Figure for SampleSizeFigure {
    fn dimensions(&self) -> (u32, u32) {
        (1000, 500)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> FigureResult<()> {
        let (lo, hi) = self.value_range;
        let mut chart = ChartBuilder::on(root)
            .caption("Violin Plot of Dataset Sample Sizes", ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(10)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.6f64..0.9f64, (lo..hi).log_scale())
            .map_err(drawing_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .y_desc("Dataset Sample Size")
            .y_label_formatter(&|v| format!("{:.0}", v))
            .axis_desc_style(("sans-serif", 18))
            .draw()
            .map_err(drawing_err)?;

        let violin = RGBColor(173, 216, 230);
        chart
            .draw_series(std::iter::once(Polygon::new(
                self.outline.clone(),
                violin.filled(),
            )))
            .map_err(drawing_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                self.outline.clone(),
                BLACK.stroke_width(1),
            )))
            .map_err(drawing_err)?;

        chart
            .draw_series(
                self.points
                    .iter()
                    .map(|&p| Circle::new(p, 3, BLACK.mix(0.5).filled())),
            )
            .map_err(drawing_err)?;

        let label_style = TextStyle::from(("sans-serif", 16).into_font())
            .pos(Pos::new(HPos::Left, VPos::Center));
        chart
            .draw_series(self.summary.entries().into_iter().map(|(label, value)| {
                Text::new(
                    format!("{label}: {}", value as i64),
                    (LABEL_X, value),
                    label_style.clone(),
                )
            }))
            .map_err(drawing_err)?;

        Ok(())
    }
}
