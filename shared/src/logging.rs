//! Tracing bootstrap shared by the harness binary and its tools

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize a fmt subscriber for the harness process.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("harness=debug,stubs=debug,info")
    } else {
        EnvFilter::new("harness=info,stubs=info,warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
