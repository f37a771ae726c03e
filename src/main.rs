use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    if let Err(e) = quake::cli::run() {
        eprintln!("{}", quake::ui::error(&e.to_string()));
        process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` when set
fn init_tracing() {
    let args: Vec<String> = std::env::args().collect();
    let default = if quake::cli::verbose_requested(&args) { "quake=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
