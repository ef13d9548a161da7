use tracing_subscriber::EnvFilter;

/// Directive used when `MONASPECT_LOG` is unset or invalid.
const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs a stderr subscriber filtered by `MONASPECT_LOG`, keeping stdout
/// free for JSON output.
pub fn init() {
    let filter = EnvFilter::try_from_env("MONASPECT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // A second init (tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
