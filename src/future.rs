//! Cancellable call future (spec §4.7 `call_async`, §5 "Future = mutex+condvar").
//!
//! Grounded on `oxidros-zenoh/src/service/client.rs`'s timeout wrapper, with
//! the `tokio::time::timeout` machinery replaced by `parking_lot::{Mutex,
//! Condvar}` since this crate runs entirely on synchronous Zenoh calls plus
//! `std::thread`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

enum State<T> {
    Pending,
    Ready(Result<T>),
    Cancelled,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

/// A handle to an in-flight asynchronous service call.
///
/// Produced by [`crate::service::Client::call_async`]. `cancel()` is
/// cooperative: the server is never notified, the client simply abandons the
/// pending reply.
pub struct CallFuture<T> {
    shared: Arc<Shared<T>>,
}

/// The producer side, held by the worker thread driving the call.
pub(crate) struct CallFutureSetter<T> {
    shared: Arc<Shared<T>>,
}

pub(crate) fn new_call_future<T>() -> (CallFuture<T>, CallFutureSetter<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending),
        condvar: Condvar::new(),
    });
    (
        CallFuture {
            shared: shared.clone(),
        },
        CallFutureSetter { shared },
    )
}

impl<T> CallFutureSetter<T> {
    /// Completes the future with a result, unless it was already cancelled.
    pub(crate) fn set(self, value: Result<T>) {
        let mut guard = self.shared.state.lock();
        if matches!(*guard, State::Pending) {
            *guard = State::Ready(value);
            self.shared.condvar.notify_all();
        }
    }
}

impl<T> CallFuture<T> {
    /// True once the call has completed or been cancelled.
    pub fn done(&self) -> bool {
        !matches!(*self.shared.state.lock(), State::Pending)
    }

    /// Requests cancellation. Returns `true` if cancellation took effect
    /// (the call was still pending), `false` if it had already completed.
    pub fn cancel(&self) -> bool {
        let mut guard = self.shared.state.lock();
        if matches!(*guard, State::Pending) {
            *guard = State::Cancelled;
            self.shared.condvar.notify_all();
            true
        } else {
            false
        }
    }
}

impl<T: Clone> CallFuture<T> {
    /// Blocks until the call completes, is cancelled, or `timeout` elapses.
    /// A `None` timeout blocks indefinitely. Reading a completed result does
    /// not consume it: a second call observes the same terminal value.
    pub fn result(&self, timeout: Option<Duration>) -> Result<T> {
        let mut guard = self.shared.state.lock();
        let deadline = timeout.map(|d| Instant::now() + d);
        loop {
            match &*guard {
                State::Pending => {}
                State::Cancelled => return Err(Error::ServiceCancelled),
                State::Ready(value) => {
                    return match value {
                        Ok(v) => Ok(v.clone()),
                        Err(e) => Err(e.cheap_clone()),
                    };
                }
            }
            match deadline {
                Some(dl) => {
                    let now = Instant::now();
                    if now >= dl {
                        return Err(Error::Timeout(
                            "call did not respond within the requested timeout".to_string(),
                        ));
                    }
                    let timed_out = self.shared.condvar.wait_for(&mut guard, dl - now).timed_out();
                    if timed_out && matches!(*guard, State::Pending) {
                        return Err(Error::Timeout(
                            "call did not respond within the requested timeout".to_string(),
                        ));
                    }
                }
                None => self.shared.condvar.wait(&mut guard),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_normally() {
        let (future, setter) = new_call_future::<i32>();
        setter.set(Ok(42));
        assert!(future.done());
        assert_eq!(future.result(None).unwrap(), 42);
    }

    #[test]
    fn cancel_before_completion_yields_cancelled_error() {
        let (future, _setter) = new_call_future::<i32>();
        assert!(future.cancel());
        let err = future.result(Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, Error::ServiceCancelled));
    }

    #[test]
    fn cancel_after_completion_returns_false() {
        let (future, setter) = new_call_future::<i32>();
        setter.set(Ok(1));
        assert!(!future.cancel());
    }

    #[test]
    fn reading_a_ready_result_twice_yields_the_same_value() {
        let (future, setter) = new_call_future::<i32>();
        setter.set(Ok(42));
        assert_eq!(future.result(None).unwrap(), 42);
        assert_eq!(future.result(None).unwrap(), 42);
    }

    #[test]
    fn timeout_without_completion() {
        let (future, _setter) = new_call_future::<i32>();
        let err = future.result(Some(Duration::from_millis(20))).unwrap_err();
        assert!(matches!(err, Error::Timeout(msg) if msg.contains("did not respond within")));
    }
}
