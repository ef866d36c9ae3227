use anyhow::Result;
use clap::Parser;
use physex_cli::{emit, init_logging, CommonArgs};
use physex_core::exercises::spherical::spherical_operators;

/// Divergence, curl, Laplacian and gradient in spherical coordinates.
#[derive(Parser, Debug)]
#[command(name = "spherical", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn run(cli: &Cli) -> Result<()> {
    let report = spherical_operators()?;
    emit(&report, cli.common.json)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);
    run(&cli).inspect_err(|e| log::error!("{e:#}"))
}
