//! Structured logging configuration.
//!
//! The subscriber also picks up records from the `log` facade, which is what
//! the engine crate logs through.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Build the level filter from `RUST_LOG`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize structured logging
///
/// # Example
///
/// ```no_run
/// use bracket_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a bracket mutation with structured fields
pub fn log_bracket_event(
    request_id: &str,
    event: &str,
    tournament_id: i64,
    match_id: Option<i64>,
    detail: &str,
) {
    tracing::info!(
        request_id = request_id,
        event = event,
        tournament_id = tournament_id,
        match_id = match_id,
        "{}",
        detail
    );
}
