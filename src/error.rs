//! Unified error taxonomy for ZRM (spec §7).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure kinds surfaced by ZRM.
#[derive(Debug, Error)]
pub enum Error {
    /// A message's schema did not match the endpoint's declared schema, or a
    /// payload could not be decoded as the expected schema.
    #[error("type error: {0}")]
    Type(String),

    /// A bounded-wait operation exceeded its deadline.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// The server returned an error reply (handler exception, wrong response
    /// type, or decode failure on the server side).
    #[error("service error: {0}")]
    Service(String),

    /// The caller consumed a future's result after `cancel()` had already
    /// taken effect.
    #[error("service call was cancelled")]
    ServiceCancelled,

    /// An illegal goal-state transition, a rejected goal, or another
    /// action-protocol failure.
    #[error("action error: {0}")]
    Action(String),

    /// An invalid argument to a graph query (e.g. the wrong entity kind).
    #[error("graph query error: {0}")]
    GraphQuery(String),

    /// A malformed liveliness key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The context has already been closed.
    #[error("context is closed")]
    ContextClosed,

    /// No explicit context was given and no global context is initialized.
    #[error("no context: call zrm::init() or pass an explicit Context")]
    NoContext,

    /// Underlying transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] zenoh::Error),
}

impl Error {
    /// Best-effort clone, used where a terminal value must be re-delivered
    /// to more than one reader (e.g. [`crate::future::CallFuture::result`]).
    /// Every variant carries owned data except `Transport`, whose inner
    /// `zenoh::Error` is not `Clone`; that case is re-rendered as a
    /// `Service` error preserving the original message.
    pub(crate) fn cheap_clone(&self) -> Error {
        match self {
            Error::Type(s) => Error::Type(s.clone()),
            Error::Timeout(s) => Error::Timeout(s.clone()),
            Error::Service(s) => Error::Service(s.clone()),
            Error::ServiceCancelled => Error::ServiceCancelled,
            Error::Action(s) => Error::Action(s.clone()),
            Error::GraphQuery(s) => Error::GraphQuery(s.clone()),
            Error::InvalidKey(s) => Error::InvalidKey(s.clone()),
            Error::ContextClosed => Error::ContextClosed,
            Error::NoContext => Error::NoContext,
            Error::Transport(e) => Error::Service(e.to_string()),
        }
    }
}
