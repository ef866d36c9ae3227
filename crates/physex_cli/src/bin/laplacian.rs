use anyhow::Result;
use clap::Parser;
use physex_cli::{emit, init_logging, CommonArgs, SolveArgs};
use physex_core::exercises::laplacian::laplacian_and_solve;

/// Laplacian of 1/sqrt(a·x² + b²·y² + z²) and the (a, b) that make it vanish.
///
/// Identically harmonic (a, b) are searched from starts in
/// [--guess-min, --guess-max]; an empty list means none was found there.
#[derive(Parser, Debug)]
#[command(name = "laplacian", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    solve: SolveArgs,
}

fn run(cli: &Cli) -> Result<()> {
    let report = laplacian_and_solve(cli.solve.settings())?;
    emit(&report, cli.common.json)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);
    run(&cli).inspect_err(|e| log::error!("{e:#}"))
}
