//! PRISMA flow diagram.
//!
//! The layout (box texts, coordinates, arrows and phase captions) is plain
//! data in [`PrismaLayout`]; [`PrismaDiagram::build`] resolves it into
//! absolute geometry that is then drawn unchanged onto any backend. The
//! built-in layout carries the counts of the published review.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::export::Figure;
use crate::models::{drawing_err, FigureError, FigureResult};

pub type Point = (f64, f64);

const DEFAULT_BOX_WIDTH: f64 = 4.0;
const DEFAULT_BOX_HEIGHT: f64 = 1.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

/// How a connector travels from its source anchor to its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Straight from anchor to anchor.
    #[default]
    Direct,
    /// Keeps the source height and stops on the target anchor's x.
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpec {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_box_width")]
    pub width: f64,
    #[serde(default = "default_box_height")]
    pub height: f64,
}

fn default_box_width() -> f64 {
    DEFAULT_BOX_WIDTH
}

fn default_box_height() -> f64 {
    DEFAULT_BOX_HEIGHT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRef {
    #[serde(rename = "box")]
    pub box_id: String,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowSpec {
    pub from: AnchorRef,
    pub to: AnchorRef,
    #[serde(default)]
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrismaLayout {
    /// Canvas extent in layout units.
    pub width: f64,
    pub height: f64,
    /// Output size in pixels.
    pub pixels: (u32, u32),
    pub font_size: u32,
    pub boxes: Vec<BoxSpec>,
    pub arrows: Vec<ArrowSpec>,
    pub phase_labels: Vec<PhaseLabel>,
}

fn stage(id: &str, text: &str, x: f64, y: f64) -> BoxSpec {
    BoxSpec {
        id: id.to_string(),
        text: text.to_string(),
        x,
        y,
        width: DEFAULT_BOX_WIDTH,
        height: DEFAULT_BOX_HEIGHT,
    }
}

fn exclusion(id: &str, text: &str, y: f64) -> BoxSpec {
    BoxSpec {
        id: id.to_string(),
        text: text.to_string(),
        x: 8.0,
        y,
        width: 6.0,
        height: 5.0,
    }
}

fn arrow(from: (&str, Anchor), to: (&str, Anchor), route: Route) -> ArrowSpec {
    ArrowSpec {
        from: AnchorRef {
            box_id: from.0.to_string(),
            anchor: from.1,
        },
        to: AnchorRef {
            box_id: to.0.to_string(),
            anchor: to.1,
        },
        route,
    }
}

impl Default for PrismaLayout {
    fn default() -> Self {
        let boxes = vec![
            stage(
                "identification",
                "Records identified\nthrough database search\nn = 352",
                2.0,
                12.0,
            ),
            stage("duplicates_removed", "Duplicates excluded = 2", 8.0, 12.0),
            stage(
                "screening_title_abstract",
                "Records screened\nthrough title and abstract\nn = 350",
                2.0,
                9.3,
            ),
            exclusion(
                "excluded_title_abstract",
                "Articles excluded\nthrough title and abstract\nn = 216\n\nreasons :\n\
                 • no comparison of unimodality\nversus multimodality (n= 189)\n\
                 • wrong population (n=46)\n• not a clinical-making\ndecision task (n=37)\n\
                 • wrong publication type (n=27)",
                6.1,
            ),
            stage(
                "eligibility_full_text",
                "Full-text articles\nassessed for eligibility\n(n = 134)",
                2.0,
                4.2,
            ),
            exclusion(
                "excluded_full_text",
                "Full text articles excluded\nn = 37\n\nreasons :\n\
                 • no comparison of unimodality\nversus multimodality (n = 28)\n\
                 • wrong population (n = 2)\n• not a clinical-making\ndecision task (n = 2)\n\
                 • wrong publication type (n = 4)\n• duplicate (n = 1)",
                1.0,
            ),
            stage("included", "Studies included\nin review\nn = 97", 2.0, 1.0),
        ];

        use Anchor::*;
        let arrows = vec![
            // screening pipeline, top to bottom
            arrow(("identification", Bottom), ("screening_title_abstract", Top), Route::Direct),
            arrow(("screening_title_abstract", Bottom), ("eligibility_full_text", Top), Route::Direct),
            arrow(("eligibility_full_text", Bottom), ("included", Top), Route::Direct),
            // each stage to what it removed
            arrow(("identification", Right), ("duplicates_removed", Left), Route::Horizontal),
            arrow(("screening_title_abstract", Right), ("excluded_title_abstract", Left), Route::Horizontal),
            arrow(("eligibility_full_text", Right), ("excluded_full_text", Left), Route::Horizontal),
        ];

        let phase_labels = vec![
            PhaseLabel {
                text: "Identification and screening".to_string(),
                x: 0.5,
                y: 8.0,
            },
            PhaseLabel {
                text: "Eligibility".to_string(),
                x: 0.5,
                y: 4.5,
            },
            PhaseLabel {
                text: "Included".to_string(),
                x: 0.5,
                y: 1.5,
            },
        ];

        Self {
            width: 15.0,
            height: 16.0,
            pixels: (1200, 1600),
            font_size: 17,
            boxes,
            arrows,
            phase_labels,
        }
    }
}

impl PrismaLayout {
    pub fn from_json_file(path: &Path) -> FigureResult<Self> {
        let layout = serde_json::from_reader(File::open(path)?)?;
        Ok(layout)
    }

    /// Reads `path` when it exists, otherwise writes the built-in layout
    /// there so it can be edited for the next run.
    pub fn load_or_init(path: &Path) -> FigureResult<Self> {
        if path.exists() {
            info!("Reading diagram layout from {}", path.display());
            return Self::from_json_file(path);
        }

        let layout = Self::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&layout)?)?;
        info!("Wrote default diagram layout to {}", path.display());
        Ok(layout)
    }
}

/// The five attachment points of a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub center: Point,
    pub top: Point,
    pub bottom: Point,
    pub left: Point,
    pub right: Point,
}

impl Anchors {
    pub fn of(x: f64, y: f64, width: f64, height: f64) -> Self {
        let cx = x + width / 2.0;
        let cy = y + height / 2.0;
        Self {
            center: (cx, cy),
            top: (cx, y + height),
            bottom: (cx, y),
            left: (x, cy),
            right: (x + width, cy),
        }
    }

    pub fn get(&self, anchor: Anchor) -> Point {
        match anchor {
            Anchor::Center => self.center,
            Anchor::Top => self.top,
            Anchor::Bottom => self.bottom,
            Anchor::Left => self.left,
            Anchor::Right => self.right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBox {
    pub id: String,
    pub lines: Vec<String>,
    pub lower_left: Point,
    pub upper_right: Point,
    pub anchors: Anchors,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub from: Point,
    pub to: Point,
}

impl Connector {
    /// Triangle at `to`, pointing along the connector.
    pub fn head(&self, length: f64, half_width: f64) -> [Point; 3] {
        let (dx, dy) = (self.to.0 - self.from.0, self.to.1 - self.from.1);
        let norm = (dx * dx + dy * dy).sqrt();
        if norm == 0.0 {
            return [self.to; 3];
        }
        let (ux, uy) = (dx / norm, dy / norm);
        let base = (self.to.0 - ux * length, self.to.1 - uy * length);
        [
            self.to,
            (base.0 - uy * half_width, base.1 + ux * half_width),
            (base.0 + uy * half_width, base.1 - ux * half_width),
        ]
    }
}

/// Resolved geometry of a [`PrismaLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrismaDiagram {
    pub layout: PrismaLayout,
    pub boxes: Vec<PlacedBox>,
    pub connectors: Vec<Connector>,
}

impl PrismaDiagram {
    pub fn build(layout: PrismaLayout) -> FigureResult<Self> {
        let mut by_id: HashMap<&str, Anchors> = HashMap::new();
        let mut boxes = Vec::with_capacity(layout.boxes.len());

        for spec in &layout.boxes {
            if spec.width <= 0.0 || spec.height <= 0.0 {
                return Err(FigureError::Layout(format!(
                    "box '{}' has no area",
                    spec.id
                )));
            }
            let anchors = Anchors::of(spec.x, spec.y, spec.width, spec.height);
            if by_id.insert(spec.id.as_str(), anchors).is_some() {
                return Err(FigureError::Layout(format!("duplicate box id '{}'", spec.id)));
            }
            boxes.push(PlacedBox {
                id: spec.id.clone(),
                lines: spec.text.lines().map(str::to_string).collect(),
                lower_left: (spec.x, spec.y),
                upper_right: (spec.x + spec.width, spec.y + spec.height),
                anchors,
            });
        }

        let lookup = |r: &AnchorRef| -> FigureResult<Point> {
            by_id
                .get(r.box_id.as_str())
                .map(|a| a.get(r.anchor))
                .ok_or_else(|| FigureError::Layout(format!("unknown box '{}'", r.box_id)))
        };

        let connectors = layout
            .arrows
            .iter()
            .map(|arrow| {
                let from = lookup(&arrow.from)?;
                let target = lookup(&arrow.to)?;
                let to = match arrow.route {
                    Route::Direct => target,
                    Route::Horizontal => (target.0, from.1),
                };
                Ok(Connector { from, to })
            })
            .collect::<FigureResult<Vec<_>>>()?;
        debug!(
            "Diagram has {} boxes and {} connectors",
            boxes.len(),
            connectors.len()
        );

        Ok(Self {
            layout,
            boxes,
            connectors,
        })
    }

    pub fn find(&self, id: &str) -> Option<&PlacedBox> {
        self.boxes.iter().find(|b| b.id == id)
    }
}

impl Figure for PrismaDiagram {
    fn dimensions(&self) -> (u32, u32) {
        self.layout.pixels
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> FigureResult<()> {
        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .build_cartesian_2d(0.0..self.layout.width, 0.0..self.layout.height)
            .map_err(drawing_err)?;
        // No mesh: the diagram has no axes.

        let font_size = self.layout.font_size as i32;
        let line_height = font_size + 4;
        let centred = TextStyle::from(("sans-serif", font_size).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));

        for placed in &self.boxes {
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [placed.lower_left, placed.upper_right],
                    WHITE.filled(),
                )))
                .map_err(drawing_err)?;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [placed.lower_left, placed.upper_right],
                    BLACK.stroke_width(1),
                )))
                .map_err(drawing_err)?;

            let first = -((placed.lines.len() as i32 - 1) * line_height) / 2;
            chart
                .draw_series(placed.lines.iter().enumerate().map(|(i, line)| {
                    EmptyElement::at(placed.anchors.center)
                        + Text::new(
                            line.clone(),
                            (0, first + i as i32 * line_height),
                            centred.clone(),
                        )
                }))
                .map_err(drawing_err)?;
        }

        for connector in &self.connectors {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![connector.from, connector.to],
                    BLACK.stroke_width(2),
                )))
                .map_err(drawing_err)?;
            chart
                .draw_series(std::iter::once(Polygon::new(
                    connector.head(0.25, 0.1).to_vec(),
                    BLACK.filled(),
                )))
                .map_err(drawing_err)?;
        }

        let phase_font = ("sans-serif", font_size + 4)
            .into_font()
            .style(FontStyle::Bold)
            .transform(FontTransform::Rotate270);
        chart
            .draw_series(self.layout.phase_labels.iter().map(|label| {
                Text::new(label.text.clone(), (label.x, label.y), phase_font.clone())
            }))
            .map_err(drawing_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::export::render_svg;

    fn default_diagram() -> PrismaDiagram {
        PrismaDiagram::build(PrismaLayout::default()).unwrap()
    }

    #[test]
    fn default_layout_has_seven_boxes_and_six_arrows() {
        let diagram = default_diagram();
        assert_eq!(diagram.boxes.len(), 7);
        assert_eq!(diagram.connectors.len(), 6);
        assert_eq!(diagram.layout.phase_labels.len(), 3);
    }

    #[test]
    fn anchors_sit_on_box_edges() {
        let a = Anchors::of(2.0, 12.0, 4.0, 1.8);
        assert_eq!(a.center, (4.0, 12.9));
        assert_eq!(a.top, (4.0, 13.8));
        assert_eq!(a.bottom, (4.0, 12.0));
        assert_eq!(a.left, (2.0, 12.9));
        assert_eq!(a.right, (6.0, 12.9));
        assert_eq!(a.get(Anchor::Right), a.right);
    }

    #[test]
    fn pipeline_arrows_run_down_and_exclusions_run_sideways() {
        let diagram = default_diagram();
        let (vertical, horizontal): (Vec<&Connector>, Vec<&Connector>) = diagram
            .connectors
            .iter()
            .partition(|c| c.from.0 == c.to.0);

        assert_eq!(vertical.len(), 3);
        assert!(vertical.iter().all(|c| c.from.1 > c.to.1));
        assert_eq!(horizontal.len(), 3);
        assert!(horizontal
            .iter()
            .all(|c| c.from.1 == c.to.1 && c.from.0 < c.to.0));
    }

    #[test]
    fn horizontal_arrows_land_inside_their_exclusion_box() {
        let diagram = default_diagram();
        for (stage, excluded) in [
            ("screening_title_abstract", "excluded_title_abstract"),
            ("eligibility_full_text", "excluded_full_text"),
        ] {
            let from = diagram.find(stage).unwrap().anchors.right;
            let target = diagram.find(excluded).unwrap();
            let connector = diagram
                .connectors
                .iter()
                .find(|c| c.from == from)
                .unwrap();
            assert_eq!(connector.to.0, target.lower_left.0);
            assert!(connector.to.1 > target.lower_left.1 && connector.to.1 < target.upper_right.1);
        }
    }

    #[test]
    fn building_twice_gives_the_same_geometry() {
        assert_eq!(default_diagram(), default_diagram());
    }

    #[test]
    fn arrow_head_points_at_target() {
        let c = Connector {
            from: (4.0, 12.0),
            to: (4.0, 11.1),
        };
        let [tip, left, right] = c.head(0.25, 0.1);
        assert_eq!(tip, (4.0, 11.1));
        assert!((left.1 - 11.35).abs() < 1e-9 && (right.1 - 11.35).abs() < 1e-9);
        assert!((left.0 - right.0).abs() > 0.19);
    }

    #[test]
    fn unknown_box_reference_is_rejected() {
        let mut layout = PrismaLayout::default();
        layout.arrows[0].to.box_id = "nowhere".to_string();
        match PrismaDiagram::build(layout) {
            Err(FigureError::Layout(msg)) => assert!(msg.contains("nowhere")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn duplicate_box_ids_are_rejected() {
        let mut layout = PrismaLayout::default();
        layout.boxes[1].id = layout.boxes[0].id.clone();
        assert!(matches!(
            PrismaDiagram::build(layout),
            Err(FigureError::Layout(_))
        ));
    }

    #[test]
    fn layout_file_is_created_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("prisma_layout.json");

        let written = PrismaLayout::load_or_init(&path).unwrap();
        assert!(path.exists());

        let mut edited = written.clone();
        edited.boxes[6].text = "Studies included\nin review\nn = 98".to_string();
        fs::write(&path, serde_json::to_string(&edited).unwrap()).unwrap();

        let reread = PrismaLayout::load_or_init(&path).unwrap();
        assert_eq!(reread, edited);
    }

    #[test]
    fn box_size_defaults_when_omitted() {
        let spec: BoxSpec =
            serde_json::from_str(r#"{"id": "x", "text": "t", "x": 1.0, "y": 2.0}"#).unwrap();
        assert_eq!((spec.width, spec.height), (DEFAULT_BOX_WIDTH, DEFAULT_BOX_HEIGHT));
    }

    #[test]
    fn renders_boxes_arrows_and_phase_labels() {
        let svg = render_svg(&default_diagram()).unwrap();
        // One filled head per arrow.
        assert_eq!(svg.matches("<polygon").count(), 6);
        assert!(svg.contains("Records screened"));
        assert!(svg.contains("Eligibility"));
    }
}
