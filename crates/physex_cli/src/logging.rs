use crate::cli::CommonArgs;
use env_logger::Env;

/// Installs the global logger. `RUST_LOG` still refines individual targets.
pub fn init_logging(args: &CommonArgs) {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .filter_level(args.level_filter())
        .format_timestamp(None)
        .try_init();
}
