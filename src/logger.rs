//! Structured logging setup (ambient stack, grounded on
//! `oxidros-zenoh/src/logger.rs`).
//!
//! Initializes a `tracing` subscriber and bridges any dependency that still
//! logs through the `log` facade. Safe to call more than once; only the
//! first call takes effect.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initializes ZRM's logging. `name` is attached as a static field on every
/// event, useful for distinguishing multiple nodes in one process's logs.
pub fn init_logging(name: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let _ = tracing_log::LogTracer::init();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
        tracing::info!(node = name, "zrm logging initialized");
    });
}

pub use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logging("test-a");
        init_logging("test-b");
        info!("logging works");
        log::info!("log crate bridge works");
    }
}
