use std::collections::HashMap;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::analysis::export::Figure;
use crate::analysis::statistics::DeltaStats;
use crate::models::{drawing_err, FigureResult, PerformanceRecords};

pub type Point = (f64, f64);

/// Both axes are clipped to this AUC range.
pub const AUC_RANGE: (f64, f64) = (0.5, 1.0);

/// tab20, in its usual order.
const PALETTE: [RGBColor; 20] = [
    RGBColor(31, 119, 180),
    RGBColor(174, 199, 232),
    RGBColor(255, 127, 14),
    RGBColor(255, 187, 120),
    RGBColor(44, 160, 44),
    RGBColor(152, 223, 138),
    RGBColor(214, 39, 40),
    RGBColor(255, 152, 150),
    RGBColor(148, 103, 189),
    RGBColor(197, 176, 213),
    RGBColor(140, 86, 75),
    RGBColor(196, 156, 148),
    RGBColor(227, 119, 194),
    RGBColor(247, 182, 210),
    RGBColor(127, 127, 127),
    RGBColor(199, 199, 199),
    RGBColor(188, 189, 34),
    RGBColor(219, 219, 141),
    RGBColor(23, 190, 207),
    RGBColor(158, 218, 229),
];

const DASHED: [f64; 2] = [0.012, 0.008];
const DASH_DOT: [f64; 4] = [0.014, 0.006, 0.003, 0.006];

#[derive(Debug, Clone, PartialEq)]
pub struct ModalityGroup {
    pub label: String,
    pub color: RGBColor,
    pub count: usize,
}

/// One group per distinct label, in first-seen order; colours cycle through
/// the palette.
pub fn group_modalities(labels: &[String]) -> Vec<ModalityGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<ModalityGroup> = Vec::new();
    for label in labels {
        let slot = *index.entry(label.as_str()).or_insert_with(|| {
            groups.push(ModalityGroup {
                label: label.clone(),
                color: PALETTE[groups.len() % PALETTE.len()],
                count: 0,
            });
            groups.len() - 1
        });
        groups[slot].count += 1;
    }
    groups
}

/// Splits the segment `from -> to` into the "on" pieces of a repeating
/// on/off `pattern`, lengths in data units.
pub fn dash_segments(from: Point, to: Point, pattern: &[f64]) -> Vec<[Point; 2]> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 || pattern.is_empty() || pattern.iter().any(|&p| p <= 0.0) {
        return vec![[from, to]];
    }
    let at = |s: f64| (from.0 + dx * s / length, from.1 + dy * s / length);

    let mut segments = Vec::new();
    let mut walked = 0.0;
    for (i, &step) in pattern.iter().cycle().enumerate() {
        if walked >= length {
            break;
        }
        let end = (walked + step).min(length);
        if i % 2 == 0 {
            segments.push([at(walked), at(end)]);
        }
        walked = end;
    }
    segments
}

/// Unimodal vs. multimodal AUC per study, coloured by modality combination.
#[derive(Debug, Clone)]
pub struct PerformanceFigure {
    records: PerformanceRecords,
    pub groups: Vec<ModalityGroup>,
    pub stats: DeltaStats,
}

impl PerformanceFigure {
    pub fn new(records: PerformanceRecords) -> FigureResult<Self> {
        let stats = DeltaStats::compute(&records)?;
        let groups = group_modalities(records.modalities());
        Ok(Self {
            records,
            groups,
            stats,
        })
    }

    /// Scores of `label` that fall inside the plotted square. Rows outside it
    /// still count towards the group and the statistics.
    pub fn visible_points(&self, label: &str) -> Vec<Point> {
        let inside = |v: f64| (AUC_RANGE.0..=AUC_RANGE.1).contains(&v);
        self.records
            .rows()
            .filter(|&(b, c, m)| m == label && inside(b) && inside(c))
            .map(|(b, c, _)| (b, c))
            .collect()
    }

    /// `y = x + median_delta` cut to the plotted square, or `None` when the
    /// line misses it.
    pub fn median_line(&self) -> Option<(Point, Point)> {
        let (lo, hi) = AUC_RANGE;
        let m = self.stats.median_delta;
        let start = lo.max(lo - m);
        let end = hi.min(hi - m);
        (end > start).then(|| ((start, start + m), (end, end + m)))
    }
}

impl Figure for PerformanceFigure {
    fn dimensions(&self) -> (u32, u32) {
        (2200, 800)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> FigureResult<()> {
        let (lo, hi) = AUC_RANGE;
        let mut chart = ChartBuilder::on(root)
            .caption(
                "Unimodality vs. Multimodality AUC Performance",
                ("sans-serif", 30).into_font().style(FontStyle::Bold),
            )
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(lo..hi, lo..hi)
            .map_err(drawing_err)?;

        chart
            .configure_mesh()
            .x_desc("Unimodality AUC")
            .y_desc("Multimodality AUC")
            .axis_desc_style(("sans-serif", 22))
            .label_style(("sans-serif", 16))
            .light_line_style(BLACK.mix(0.05))
            .bold_line_style(BLACK.mix(0.2))
            .draw()
            .map_err(drawing_err)?;

        for group in &self.groups {
            let color = group.color;
            chart
                .draw_series(self.visible_points(&group.label).into_iter().map(move |p| {
                    EmptyElement::at(p)
                        + Circle::new((0, 0), 6, color.mix(0.9).filled())
                        + Circle::new((0, 0), 6, BLACK.stroke_width(1))
                }))
                .map_err(drawing_err)?
                .label(format!("{} ({})", group.label, group.count))
                .legend(move |(x, y)| Circle::new((x + 10, y), 6, color.filled()));
        }

        let equal = RED.stroke_width(2);
        chart
            .draw_series(
                dash_segments((lo, lo), (hi, hi), &DASHED)
                    .into_iter()
                    .map(move |seg| PathElement::new(seg.to_vec(), equal)),
            )
            .map_err(drawing_err)?
            .label("y = x (Equal Performance)")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], equal));

        let shifted = BLUE.stroke_width(2);
        let median_dashes = self
            .median_line()
            .map(|(start, end)| dash_segments(start, end, &DASH_DOT))
            .unwrap_or_default();
        chart
            .draw_series(
                median_dashes
                    .into_iter()
                    .map(move |seg| PathElement::new(seg.to_vec(), shifted)),
            )
            .map_err(drawing_err)?
            .label(format!("Median Threshold (Δ={:.2})", self.stats.median_delta))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], shifted));

        let callout = ("sans-serif", 20).into_font().style(FontStyle::Bold).color(&BLUE);
        for (text, at, frame) in [
            ("Favors Multimodality", (0.55, 0.90), GREEN),
            ("Favors Unimodality", (0.60, 0.55), RGBColor(255, 165, 0)),
        ] {
            let width = text.chars().count() as i32 * 11;
            chart
                .plotting_area()
                .draw(
                    &(EmptyElement::at(at)
                        + Rectangle::new([(-10, -8), (width + 10, 28)], WHITE.filled())
                        + Rectangle::new([(-10, -8), (width + 10, 28)], frame.stroke_width(2))
                        + Text::new(text, (0, 0), callout.clone())),
                )
                .map_err(drawing_err)?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", 15))
            .position(SeriesLabelPosition::LowerRight)
            .draw()
            .map_err(drawing_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::export::render_svg;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn colours_follow_first_appearance() {
        let groups = group_modalities(&labels(&["MRI", "CT", "MRI", "PET", "CT", "MRI"]));
        let summary: Vec<(&str, usize)> =
            groups.iter().map(|g| (g.label.as_str(), g.count)).collect();
        assert_eq!(summary, vec![("MRI", 3), ("CT", 2), ("PET", 1)]);
        assert_eq!(groups[0].color, PALETTE[0]);
        assert_eq!(groups[1].color, PALETTE[1]);
        assert_eq!(groups[2].color, PALETTE[2]);
    }

    #[test]
    fn palette_wraps_after_twenty_groups() {
        let names: Vec<String> = (0..22).map(|i| format!("combo {i}")).collect();
        let groups = group_modalities(&names);
        assert_eq!(groups.len(), 22);
        assert_eq!(groups[20].color, PALETTE[0]);
        assert_eq!(groups[21].color, PALETTE[1]);
    }

    #[test]
    fn median_line_is_offset_and_cut_to_the_square() {
        let records = PerformanceRecords::new(
            vec![0.6, 0.7, 0.8],
            vec![0.65, 0.72, 0.95],
            labels(&["a", "b", "a"]),
        )
        .unwrap();
        let figure = PerformanceFigure::new(records).unwrap();
        // median delta 0.05
        let (start, end) = figure.median_line().unwrap();
        assert!((start.0 - 0.5).abs() < 1e-9 && (start.1 - 0.55).abs() < 1e-9);
        assert!((end.0 - 0.95).abs() < 1e-9 && (end.1 - 1.0).abs() < 1e-9);
        assert_eq!(figure.groups.len(), 2);
    }

    #[test]
    fn negative_median_line_starts_on_the_bottom_edge() {
        let records =
            PerformanceRecords::new(vec![0.9, 0.8], vec![0.7, 0.6], labels(&["a", "a"])).unwrap();
        let figure = PerformanceFigure::new(records).unwrap();
        let (start, end) = figure.median_line().unwrap();
        assert!((start.0 - 0.7).abs() < 1e-9 && (start.1 - 0.5).abs() < 1e-9);
        assert!((end.0 - 1.0).abs() < 1e-9 && (end.1 - 0.8).abs() < 1e-9);
    }

    #[test]
    fn median_line_outside_the_square_is_not_drawn() {
        let records =
            PerformanceRecords::new(vec![0.5, 0.4], vec![1.0, 0.95], labels(&["a", "a"])).unwrap();
        let figure = PerformanceFigure::new(records).unwrap();
        assert!(figure.stats.median_delta >= 0.5);
        assert_eq!(figure.median_line(), None);
    }

    #[test]
    fn out_of_range_scores_are_counted_but_not_drawn() {
        let records = PerformanceRecords::new(
            vec![0.3, 0.7, 0.8, 1.0],
            vec![0.45, 1.2, 0.85, 0.5],
            labels(&["a", "a", "a", "b"]),
        )
        .unwrap();
        let figure = PerformanceFigure::new(records).unwrap();
        assert_eq!(figure.stats.total, 4);
        assert_eq!(figure.groups[0].count, 3);

        assert_eq!(figure.visible_points("a"), vec![(0.8, 0.85)]);
        // The square's own corner is inside it.
        assert_eq!(figure.visible_points("b"), vec![(1.0, 0.5)]);
    }

    #[test]
    fn renders_only_the_points_inside_the_axes() {
        let records = PerformanceRecords::new(
            vec![0.3, 0.7, 0.8],
            vec![0.45, 1.2, 0.85],
            labels(&["MRI", "MRI", "MRI"]),
        )
        .unwrap();
        let figure = PerformanceFigure::new(records).unwrap();

        let svg = render_svg(&figure).unwrap();
        // One visible study (fill + outline) and one legend marker.
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("MRI (3)"));
    }

    #[test]
    fn dashes_cover_the_line_in_order() {
        let segments = dash_segments((0.5, 0.5), (1.0, 0.5), &[0.1, 0.05]);
        // 0.5 long, 0.15 period: dashes start at 0, 0.15, 0.30, 0.45.
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0][0], (0.5, 0.5));
        assert!(segments.windows(2).all(|w| w[0][1].0 < w[1][0].0));
        let last = segments[segments.len() - 1][1];
        assert!((last.0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_pattern_draws_solid_line() {
        assert_eq!(
            dash_segments((0.0, 0.0), (1.0, 1.0), &[]),
            vec![[(0.0, 0.0), (1.0, 1.0)]]
        );
    }
}
