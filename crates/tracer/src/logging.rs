use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Install a compact stderr subscriber for host binaries. Later calls are
/// no-ops, so libraries and tests can call this freely.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .try_init();
}
