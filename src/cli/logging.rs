use tracing_subscriber::EnvFilter;

const CRATE_TARGETS : &[&str] = &["pmh"];

/// Initializes tracing from the number of -v flags
/// (0 = warn, 1 = info, 2 = debug, 3+ = trace). `RUST_LOG` takes precedence.
pub fn init(verbosity : u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace"
    };
    let default_filter = CRATE_TARGETS
        .iter()
        .map(|t| format!("{}={}", t, level) )
        .collect::<Vec<_>>()
        .join(",");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
