//! Lazy-value infrastructure for Kite.
//!
//! This crate currently provides:
//! - [`LazyValue`]: a memoizing thunk with an explicit state machine and
//!   reentrancy detection.
//! - [`LazyError`]: the error surface for lazy computation, with a distinct
//!   variant for reentrant forcing.
//!
//! Declaration resolution elsewhere in Kite produces values (notably types)
//! whose computation may still be in flight when a consumer first asks for
//! them. A [`LazyValue`] runs its computation at most once and caches the
//! result. Forcing a value whose own computation is still running signals
//! [`LazyError::Reentrant`] instead of deadlocking or recursing: the
//! declaration graph is supposed to be a DAG, so a reentrant force means a
//! genuine cycle (e.g. a class whose supertype resolution depends on itself).

use std::fmt;

use parking_lot::Mutex;

/// Errors produced by forcing a [`LazyValue`].
///
/// These are internal-consistency errors, not user-input errors. Callers
/// should surface them, never convert them into diagnostics about user code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LazyError {
    /// The value was forced again while its own computation was running.
    ///
    /// Indicates a true cycle in what should be a DAG of declarations.
    #[error("reentrant evaluation of lazy value `{0}`")]
    Reentrant(String),
    /// The computation itself returned an error; replayed on every
    /// subsequent force.
    #[error("lazy value `{0}` failed to compute: {1}")]
    Failed(String, String),
}

type Compute<T> = Box<dyn FnOnce() -> Result<T, LazyError> + Send>;

enum State<T> {
    NotStarted(Compute<T>),
    InProgress,
    Done(T),
    Failed(LazyError),
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::NotStarted(_) => f.write_str("NotStarted"),
            State::InProgress => f.write_str("InProgress"),
            State::Done(value) => f.debug_tuple("Done").field(value).finish(),
            State::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// A single-computation memoizing thunk.
///
/// The computation runs on the first [`force`](LazyValue::force); its result
/// (or error) is cached and replayed on every later force. `LazyValue` is not
/// a synchronization primitive: the lock is released while the computation
/// runs, and any force observing an in-flight computation — same stack or
/// another thread — reports [`LazyError::Reentrant`]. Values are expected to
/// be forced from the single thread that owns the enclosing resolution pass.
pub struct LazyValue<T> {
    name: String,
    state: Mutex<State<T>>,
}

impl<T: fmt::Debug> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl<T: Clone> LazyValue<T> {
    /// Create a lazy value that will run `compute` on first force.
    ///
    /// `name` is used only in error messages and debug output.
    pub fn new(
        name: impl Into<String>,
        compute: impl FnOnce() -> Result<T, LazyError> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::NotStarted(Box::new(compute))),
        }
    }

    /// Create an already-computed value; forcing it never runs user code.
    pub fn computed(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::Done(value)),
        }
    }

    /// Force the computation, returning the cached result if present.
    pub fn force(&self) -> Result<T, LazyError> {
        let compute = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Done(value) => return Ok(value.clone()),
                State::Failed(err) => return Err(err.clone()),
                State::InProgress => {
                    tracing::trace!(name = %self.name, "reentrant force of lazy value");
                    return Err(LazyError::Reentrant(self.name.clone()));
                }
                slot @ State::NotStarted(_) => {
                    let State::NotStarted(compute) = std::mem::replace(slot, State::InProgress)
                    else {
                        unreachable!()
                    };
                    compute
                }
            }
        };

        // The lock is intentionally not held across the computation so that a
        // reentrant force observes `InProgress` instead of deadlocking.
        let result = compute();

        let mut state = self.state.lock();
        match result {
            Ok(value) => {
                *state = State::Done(value.clone());
                Ok(value)
            }
            Err(err) => {
                tracing::trace!(name = %self.name, error = %err, "lazy value computation failed");
                *state = State::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Whether the value has successfully computed.
    ///
    /// `false` while un-forced, in progress, or failed.
    pub fn is_computed(&self) -> bool {
        matches!(&*self.state.lock(), State::Done(_))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn computes_once_and_caches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_compute = Arc::clone(&calls);
        let lazy = LazyValue::new("answer", move || {
            calls_in_compute.fetch_add(1, Ordering::SeqCst);
            Ok(42u32)
        });

        assert!(!lazy.is_computed());
        assert_eq!(lazy.force(), Ok(42));
        assert_eq!(lazy.force(), Ok(42));
        assert!(lazy.is_computed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn computed_value_never_runs_user_code() {
        let lazy = LazyValue::computed("ready", "hello".to_string());
        assert!(lazy.is_computed());
        assert_eq!(lazy.force(), Ok("hello".to_string()));
    }

    #[test]
    fn failure_is_sticky() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_compute = Arc::clone(&calls);
        let lazy: LazyValue<u32> = LazyValue::new("broken", move || {
            calls_in_compute.fetch_add(1, Ordering::SeqCst);
            Err(LazyError::Failed("broken".to_string(), "boom".to_string()))
        });

        let err = lazy.force().unwrap_err();
        assert_eq!(err, LazyError::Failed("broken".to_string(), "boom".to_string()));
        // Replayed without re-running the computation.
        assert_eq!(lazy.force().unwrap_err(), err);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!lazy.is_computed());
    }

    #[test]
    fn reentrant_force_reports_distinct_error() {
        let lazy: Arc<LazyValue<u32>> = Arc::new_cyclic(|weak: &std::sync::Weak<LazyValue<u32>>| {
            let weak = weak.clone();
            LazyValue::new("self-loop", move || {
                let me = weak.upgrade().expect("value is alive during its own force");
                me.force()
            })
        });

        assert_eq!(
            lazy.force(),
            Err(LazyError::Reentrant("self-loop".to_string()))
        );
        // The outer computation saw the inner error and recorded it.
        assert_eq!(
            lazy.force(),
            Err(LazyError::Reentrant("self-loop".to_string()))
        );
        assert!(!lazy.is_computed());
    }
}
