use anyhow::Result;
use clap::Parser;
use physex_cli::plot::render_implicit_surface;
use physex_cli::{emit, init_logging, CommonArgs, PlotArgs};
use physex_core::exercises::implicit_surface::implicit_surfaces;
use physex_core::isosurface::IsosurfaceSettings;

/// The surfaces φ₁ = 0 and φ₂ = 0, the point (2, 1, 1) and the tangent there.
#[derive(Parser, Debug)]
#[command(name = "implicit_surface", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    plot: PlotArgs,

    /// Grid points per axis
    #[arg(long, default_value_t = 100)]
    samples: usize,
}

fn run(cli: &Cli) -> Result<()> {
    let settings = IsosurfaceSettings::with_samples(cli.samples);
    let report = implicit_surfaces(&settings)?;
    emit(&report, cli.common.json)?;
    if let Some(path) = cli.plot.target("implicit_surface.svg") {
        render_implicit_surface(&report, &path)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);
    run(&cli).inspect_err(|e| log::error!("{e:#}"))
}
