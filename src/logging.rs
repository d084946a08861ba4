use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `mindbloom=debug`.
pub const LOG_ENV: &str = "MINDBLOOM_LOG";

/// Default filter directive for a `-v` count, used when `MINDBLOOM_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs a stderr formatter. Does nothing if a global subscriber is
/// already set.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false);
    if subscriber.try_init().is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
