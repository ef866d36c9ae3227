use anyhow::Result;
use clap::Parser;
use physex_cli::{emit, init_logging, CommonArgs};
use physex_core::exercises::displacement::displacement_algebra;

/// Squared displacement before and after a 45° rotation about y.
#[derive(Parser, Debug)]
#[command(name = "displacement", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);
    emit(&displacement_algebra(), cli.common.json).inspect_err(|e| log::error!("{e:#}"))
}
