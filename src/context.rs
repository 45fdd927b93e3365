//! Context: owns the transport session (spec §4.2).
//!
//! Grounded on `oxidros-zenoh/src/context.rs`'s `Context`/`ContextInner`
//! Arc pattern and its environment-variable-driven construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use zenoh::Session;

use crate::error::Result;
use crate::graph::Graph;

/// Construction options for a [`Context`].
///
/// Defaults mirror the teacher's `ROS_DOMAIN_ID` / `ZENOH_SESSION_CONFIG_URI`
/// pattern, renamed for this crate.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub domain_id: Option<u32>,
    pub zenoh_config: Option<zenoh::Config>,
}

impl Config {
    fn resolved_domain_id(&self) -> u32 {
        self.domain_id.unwrap_or_else(|| {
            std::env::var("ZRM_DOMAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        })
    }
}

struct ContextInner {
    session: Session,
    domain_id: u32,
    closed: AtomicBool,
}

/// Owns one transport session and is shared by every [`crate::node::Node`]
/// created from it.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Opens a session using the default (or `ZRM_SESSION_CONFIG_URI`-provided)
    /// Zenoh config at the given domain id.
    pub fn new(domain_id: u32) -> Result<Self> {
        Self::with_config(Config {
            domain_id: Some(domain_id),
            zenoh_config: None,
        })
    }

    /// Opens a session using environment defaults (`ZRM_DOMAIN_ID`, default config).
    pub fn from_env() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Opens a session with full control over domain id and Zenoh config.
    pub fn with_config(config: Config) -> Result<Self> {
        let domain_id = config.resolved_domain_id();
        let zenoh_config = match config.zenoh_config {
            Some(c) => c,
            None => match std::env::var("ZRM_SESSION_CONFIG_URI") {
                Ok(uri) => zenoh::Config::from_file(uri).map_err(zenoh::Error::from)?,
                Err(_) => zenoh::Config::default(),
            },
        };
        let session = zenoh::open(zenoh_config).wait()?;
        tracing::info!(domain_id, "zrm context opened");
        Ok(Self {
            inner: Arc::new(ContextInner {
                session,
                domain_id,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn domain_id(&self) -> u32 {
        self.inner.domain_id
    }

    /// Returns a cheap clone of the underlying session handle. `Session` is
    /// internally `Arc`-backed, so endpoints hold an owned clone rather than
    /// a borrow tied to this `Context`'s lifetime — the same pattern the
    /// teacher's `ContextInner` relies on for declared publishers/subscribers
    /// that must outlive any single borrow of the context.
    pub(crate) fn session(&self) -> Session {
        self.inner.session.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Creates a fresh [`Graph`] bound to this context's session and domain.
    pub fn graph(&self) -> Result<Graph> {
        Graph::new(self.inner.session.clone(), self.inner.domain_id)
    }

    /// Idempotent teardown: closes the transport session and releases the
    /// process registry entry (spec §4.2). Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.session.clone().close().wait()?;
        tracing::info!(domain_id = self.inner.domain_id, "zrm context closed");
        Ok(())
    }
}

static GLOBAL: Mutex<Option<Context>> = Mutex::new(None);

/// Initializes the process-global context. Idempotent: a second call is a
/// no-op if a global context already exists.
pub fn init() -> Result<()> {
    init_with_config(Config::default())
}

/// Like [`init`], but with explicit construction options.
pub fn init_with_config(config: Config) -> Result<()> {
    let mut guard = GLOBAL.lock();
    if guard.is_some() {
        return Ok(());
    }
    *guard = Some(Context::with_config(config)?);
    Ok(())
}

/// Tears down the process-global context, if any. Tolerant of a missing
/// global (never raises).
pub fn shutdown() {
    let mut guard = GLOBAL.lock();
    if let Some(ctx) = guard.take() {
        let _ = ctx.close();
    }
}

/// Returns a clone of the process-global context, or `None` if uninitialized.
pub fn global() -> Option<Context> {
    GLOBAL.lock().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reads_domain_from_env_when_unset() {
        std::env::set_var("ZRM_DOMAIN_ID", "7");
        let cfg = Config::default();
        assert_eq!(cfg.resolved_domain_id(), 7);
        std::env::remove_var("ZRM_DOMAIN_ID");
    }

    #[test]
    fn explicit_domain_id_overrides_env() {
        std::env::set_var("ZRM_DOMAIN_ID", "7");
        let cfg = Config {
            domain_id: Some(3),
            zenoh_config: None,
        };
        assert_eq!(cfg.resolved_domain_id(), 3);
        std::env::remove_var("ZRM_DOMAIN_ID");
    }
}
