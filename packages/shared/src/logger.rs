//! Logging setup for the collaboration gateway.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the gateway library crate and the binary. `RUST_LOG`
/// takes precedence over `default_log_level` when it is set.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "collab_gateway")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn")
///
/// # Examples
///
/// ```no_run
/// use collab_shared::logger::setup_logger;
///
/// setup_logger("collab_gateway", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the directive string used when `RUST_LOG` is absent.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "collab_gateway={level},{bin}={level},tower_http={level}",
        level = default_log_level,
        bin = binary_name.replace('-', "_"),
    )
}
