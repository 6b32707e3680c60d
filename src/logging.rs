use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive, e.g. `rtl_callgraph=debug`.
pub const LOG_ENV: &str = "RTL_CALLGRAPH_LOG";

/// Install a stderr subscriber; stdout is reserved for the graph document.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
