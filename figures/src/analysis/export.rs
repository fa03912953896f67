use std::fs::{self, create_dir_all};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_backend::DrawingBackend;
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;
use tracing::{error, info, warn};

use crate::models::{drawing_err, FigureError, FigureResult};

/// A figure that can be drawn onto any plotters backend.
///
/// Implementors hold only plain data; the drawing area belongs to the
/// exporter and lives for a single `draw` call.
pub trait Figure {
    /// Output size in pixels.
    fn dimensions(&self) -> (u32, u32);

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> FigureResult<()>;
}

/// Paths written by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFigure {
    pub svg: PathBuf,
    pub png: PathBuf,
}

pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Writes `figure` as `<base_name>_<timestamp>.svg` and `.png` into
/// `output_dir`, creating the directory when needed.
pub fn save_figure<F: Figure>(
    figure: &F,
    output_dir: &Path,
    base_name: &str,
) -> FigureResult<SavedFigure> {
    save_figure_stamped(figure, output_dir, base_name, &timestamp())
}

pub fn save_figure_stamped<F: Figure>(
    figure: &F,
    output_dir: &Path,
    base_name: &str,
    stamp: &str,
) -> FigureResult<SavedFigure> {
    create_dir_all(output_dir).map_err(|e| {
        error!("Failed to create output directory {}: {}", output_dir.display(), e);
        e
    })?;

    let stem = format!("{base_name}_{stamp}");
    let saved = SavedFigure {
        svg: output_dir.join(format!("{stem}.svg")),
        png: output_dir.join(format!("{stem}.png")),
    };

    // The SVG is rendered in memory first, so a failing figure leaves no
    // file behind in either format.
    let svg_text = render_svg(figure)?;
    let written = {
        let root = BitMapBackend::new(&saved.png, figure.dimensions()).into_drawing_area();
        render(figure, &root)
    }
    .and_then(|()| fs::write(&saved.svg, &svg_text).map_err(FigureError::from));

    if let Err(e) = written {
        error!("Failed to export {}: {}", stem, e);
        discard(&saved);
        return Err(e);
    }

    info!("Figure saved in png and svg: {}", output_dir.join(stem).display());
    Ok(saved)
}

/// Draws `figure` into an SVG document held in memory.
pub fn render_svg<F: Figure>(figure: &F) -> FigureResult<String> {
    let mut text = String::new();
    {
        let root = SVGBackend::with_string(&mut text, figure.dimensions()).into_drawing_area();
        render(figure, &root)?;
    }
    Ok(text)
}

fn discard(saved: &SavedFigure) {
    for path in [&saved.svg, &saved.png] {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Could not remove partial output {}: {}", path.display(), e);
            }
        }
    }
}

fn render<F: Figure, DB: DrawingBackend>(
    figure: &F,
    root: &DrawingArea<DB, Shift>,
) -> FigureResult<()> {
    root.fill(&WHITE).map_err(drawing_err)?;
    figure.draw(root)?;
    root.present().map_err(drawing_err)?;
    Ok(())
}
