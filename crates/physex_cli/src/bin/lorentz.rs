use anyhow::Result;
use clap::Parser;
use physex_cli::plot::render_minkowski;
use physex_cli::{emit, init_logging, CommonArgs, PlotArgs};
use physex_core::exercises::lorentz::{lorentz_transform, MinkowskiSettings};

/// Lorentz transformation of two events and their Minkowski diagram.
#[derive(Parser, Debug)]
#[command(name = "lorentz", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    plot: PlotArgs,

    /// Frame velocity as a fraction of c
    #[arg(long, default_value_t = 0.6, allow_negative_numbers = true)]
    velocity: f64,
}

fn run(cli: &Cli) -> Result<()> {
    let settings = MinkowskiSettings {
        velocity: cli.velocity,
        ..MinkowskiSettings::default()
    };
    let report = lorentz_transform(&settings)?;
    emit(&report, cli.common.json)?;
    if let Some(path) = cli.plot.target("minkowski.svg") {
        render_minkowski(&report, &path)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);
    run(&cli).inspect_err(|e| log::error!("{e:#}"))
}
