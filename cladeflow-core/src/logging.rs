//! Tracing subscriber setup shared by the binary and long-running embedders

use tracing_subscriber::EnvFilter;

/// Environment variable consulted before the configured level
pub const LOG_ENV_VAR: &str = "CLADEFLOW_LOG";

/// Build the filter from `CLADEFLOW_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Map a `-v` count onto a level; zero keeps `configured`.
pub fn level_for_verbosity(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global fmt subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
