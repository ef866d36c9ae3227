//! Shared plumbing for the exercise binaries: command-line options, logging
//! setup, report output and SVG rendering.

pub mod cli;
pub mod logging;
pub mod output;
pub mod plot;

pub use cli::{CommonArgs, LogLevel, PlotArgs, SolveArgs};
pub use logging::init_logging;
pub use output::emit;
