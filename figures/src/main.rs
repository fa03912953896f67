use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use prisma_figures::analysis::export::save_figure;
use prisma_figures::analysis::performance_plot::PerformanceFigure;
use prisma_figures::analysis::prisma::{PrismaDiagram, PrismaLayout};
use prisma_figures::analysis::sample_size_plot::SampleSizeFigure;
use prisma_figures::data_handling::any_dataset::DataSource;
use prisma_figures::data_handling::performance::PerformanceDataset;
use prisma_figures::data_handling::sample_size::SampleSizeDataset;
use prisma_figures::helper_functions::project_root;
use prisma_figures::models::Dataset;

const DATA_DIR: &str = "data";
const LAYOUT_FILE: &str = "config/prisma_layout.json";

const PRISMA_OUTPUT: &str = "figures/figure1/figures";
const PERFORMANCE_OUTPUT: &str = "figures/figure3/saved_fig";
const SAMPLE_SIZE_OUTPUT: &str = "figures/figure4/saved_fig";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let root = project_root();
    info!("Generating manuscript figures under {}", root.display());

    let pipelines: [(&str, fn(&Path) -> Result<()>); 3] = [
        ("PRISMA flowchart", run_prisma),
        ("performance plot", run_performance),
        ("sample size plot", run_sample_size),
    ];

    let mut failed = 0;
    for (name, pipeline) in pipelines {
        match pipeline(&root) {
            Ok(()) => info!("✓ {}", name),
            Err(e) => {
                failed += 1;
                error!("Error: {:#}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} figures could not be generated", failed, pipelines.len());
    }
    Ok(())
}

fn run_prisma(root: &Path) -> Result<()> {
    let layout = PrismaLayout::load_or_init(&root.join(LAYOUT_FILE))
        .context("loading the PRISMA layout")?;
    let diagram = PrismaDiagram::build(layout).context("building the PRISMA diagram")?;
    save_figure(&diagram, &root.join(PRISMA_OUTPUT), "prisma_flowchart")?;
    Ok(())
}

fn run_performance(root: &Path) -> Result<()> {
    let dataset = PerformanceDataset::new(DataSource::Directory(root.join(DATA_DIR)));
    let records = dataset
        .load_validated()
        .context("preparing the performance comparison data")?;

    let figure = PerformanceFigure::new(records)?;
    figure.stats.report();
    save_figure(&figure, &root.join(PERFORMANCE_OUTPUT), "performance_plot")?;
    Ok(())
}

fn run_sample_size(root: &Path) -> Result<()> {
    let dataset = SampleSizeDataset {
        source: DataSource::Directory(root.join(DATA_DIR)),
    };
    let sizes = dataset
        .load_validated()
        .context("preparing the sample size data")?;

    let figure = SampleSizeFigure::new(&sizes)?;
    figure.log_summary();
    save_figure(&figure, &root.join(SAMPLE_SIZE_OUTPUT), "violinplot_samplesize")?;
    Ok(())
}
