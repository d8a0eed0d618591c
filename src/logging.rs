use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "YAML_CONFIG_LOG";

/// Installs a stderr subscriber filtered by `YAML_CONFIG_LOG` (default
/// `warn`). Does nothing if a global subscriber is already set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
