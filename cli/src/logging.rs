//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Initialize logging. `RUST_LOG` wins over the command-line flags.
pub fn init(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(quiet, verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init()
        .ok();
}

fn directives(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "ltfw=debug,ltfw_core=debug,warn"
    } else {
        "ltfw=info,ltfw_core=info,warn"
    }
}
