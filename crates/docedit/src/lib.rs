pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Verbosity comes from `DOCEDIT_LOG`
/// (falling back to `warn`) and output goes to stderr so stdout stays scriptable.
pub fn init() {
    let filter = EnvFilter::try_from_env("DOCEDIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
