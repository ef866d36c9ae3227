use clap::{Args, ValueEnum};
use physex_core::solve::SolveSettings;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Flags every exercise accepts.
#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    /// Enable debug logging (overrides --log-level)
    #[arg(short, long, env = "PHYSEX_DEBUG")]
    pub debug: bool,

    /// Log level
    #[arg(long, value_enum, env = "PHYSEX_LOG_LEVEL", default_value = "warn")]
    pub log_level: LogLevel,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl CommonArgs {
    pub fn level_filter(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            self.log_level.into()
        }
    }
}

/// Flags for the exercises that draw a figure.
#[derive(Args, Clone, Debug)]
pub struct PlotArgs {
    /// Where to write the SVG figure
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip rendering the figure
    #[arg(long)]
    pub no_plot: bool,
}

impl PlotArgs {
    /// The requested output path, or `default` in the working directory.
    /// `None` when plotting is disabled.
    pub fn target(&self, default: &str) -> Option<PathBuf> {
        if self.no_plot {
            None
        } else {
            Some(self.output.clone().unwrap_or_else(|| PathBuf::from(default)))
        }
    }
}

/// Flags for the exercises that search for parameter values.
#[derive(Args, Clone, Debug)]
pub struct SolveArgs {
    /// Iteration cap per Gauss-Newton start
    #[arg(long, default_value_t = SolveSettings::default().max_steps)]
    pub max_steps: usize,

    /// Lower end of the initial guess range on every unknown
    #[arg(long, allow_negative_numbers = true, default_value_t = SolveSettings::default().guess_min)]
    pub guess_min: f64,

    /// Upper end of the initial guess range on every unknown
    #[arg(long, allow_negative_numbers = true, default_value_t = SolveSettings::default().guess_max)]
    pub guess_max: f64,
}

impl SolveArgs {
    pub fn settings(&self) -> SolveSettings {
        SolveSettings {
            max_steps: self.max_steps,
            guess_min: self.guess_min,
            guess_max: self.guess_max,
            ..SolveSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        plot: PlotArgs,
        #[command(flatten)]
        solve: SolveArgs,
    }

    #[test]
    fn defaults_to_warn_and_default_plot_path() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.common.log_level, LogLevel::Warn);
        assert!(!cli.common.json);
        assert_eq!(
            cli.plot.target("minkowski.svg"),
            Some(PathBuf::from("minkowski.svg"))
        );
    }

    #[test]
    fn debug_flag_overrides_level() {
        let cli = TestCli::parse_from(["test", "--debug", "--log-level", "error"]);
        assert_eq!(cli.common.level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn no_plot_disables_output() {
        let cli = TestCli::parse_from(["test", "--no-plot", "--output", "x.svg"]);
        assert_eq!(cli.plot.target("minkowski.svg"), None);
    }

    #[test]
    fn guess_range_defaults_to_the_solver_box() {
        let cli = TestCli::parse_from(["test"]);
        let settings = cli.solve.settings();
        let defaults = SolveSettings::default();
        assert_eq!(settings.guess_min, defaults.guess_min);
        assert_eq!(settings.guess_max, defaults.guess_max);
        assert_eq!(settings.max_steps, defaults.max_steps);
    }

    #[test]
    fn guess_range_accepts_negative_bounds() {
        let cli = TestCli::parse_from(["test", "--guess-min", "-10", "--guess-max", "12.5"]);
        let settings = cli.solve.settings();
        assert_eq!(settings.guess_min, -10.0);
        assert_eq!(settings.guess_max, 12.5);
    }
}
