//! Coroutine-backed context managers.
//!
//! A [`GeneratorCm`] turns a single two-phase body into a context manager:
//! everything before [`Suspend::suspend`] is setup, the suspended value is what
//! `enter` returns, and everything after is cleanup. The coroutine runs on its
//! own stack (via `corosensei`), so locals set up before the suspension stay
//! alive until `exit` resumes it.
//!
//! On `exit`, a body error is injected at the suspension point: `suspend`
//! returns `Some(error)`. The coroutine decides what happens next:
//!
//! - return `Ok(())` - the error is handled
//! - return `Err(error)` - the error is re-raised from `exit`
//!
//! # Example
//!
//! ```rust
//! use exitstack::{contextmanager, with, GeneratorError, Outcome, Suspend};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum AppError {
//!     Generator(GeneratorError),
//!     NotFound,
//! }
//!
//! impl From<GeneratorError> for AppError {
//!     fn from(e: GeneratorError) -> Self {
//!         AppError::Generator(e)
//!     }
//! }
//!
//! let lookup = contextmanager(|key: &'static str, scope: Suspend<'_, String, AppError>| {
//!     let handle = format!("handle:{}", key);
//!     match scope.suspend(handle) {
//!         Some(AppError::NotFound) => Ok(()),
//!         Some(other) => Err(other),
//!         None => Ok(()),
//!     }
//! });
//!
//! let outcome = with(lookup("users"), |handle| Ok(handle.len()));
//! assert_eq!(outcome, Ok(Outcome::Completed(12)));
//!
//! let outcome = with(lookup("users"), |_| Err::<usize, _>(AppError::NotFound));
//! assert_eq!(outcome, Ok(Outcome::Suppressed(AppError::NotFound)));
//! ```

use std::fmt;
use std::rc::Rc;

use corosensei::{Coroutine, CoroutineResult, Yielder};

use crate::manager::{ContextManager, Exit};

// ============================================================================
// GeneratorError
// ============================================================================

/// A coroutine broke the suspend-exactly-once contract.
///
/// Manager error types opt in with `From<GeneratorError>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorError {
    /// The coroutine finished during setup without suspending.
    DidNotYield,
    /// The coroutine suspended again instead of finishing during cleanup.
    DidNotStop,
    /// `enter` was called on a manager that was already entered.
    AlreadyEntered,
    /// `exit` was called on a manager that is not suspended.
    NotSuspended,
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorError::DidNotYield => write!(f, "generator didn't yield"),
            GeneratorError::DidNotStop => write!(f, "generator didn't stop"),
            GeneratorError::AlreadyEntered => write!(f, "generator was already entered"),
            GeneratorError::NotSuspended => write!(f, "generator is not suspended"),
        }
    }
}

impl std::error::Error for GeneratorError {}

// ============================================================================
// Suspend
// ============================================================================

/// Handle a coroutine body uses to hand out its value and wait for exit.
pub struct Suspend<'y, T, E> {
    yielder: &'y Yielder<Option<E>, T>,
}

impl<T, E> Suspend<'_, T, E> {
    /// Hand `value` to `enter` and wait for `exit`.
    ///
    /// Returns the body's error when `exit` was given one, `None` on a clean
    /// exit.
    pub fn suspend(&self, value: T) -> Option<E> {
        self.yielder.suspend(value)
    }
}

impl<T, E> fmt::Debug for Suspend<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspend").finish_non_exhaustive()
    }
}

// ============================================================================
// GeneratorCm
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Suspended,
    Finished,
}

/// Context manager driven by a coroutine that suspends exactly once.
///
/// Dropping a suspended manager without calling `exit` resumes the coroutine
/// as a clean exit; a failure there is logged, not propagated.
pub struct GeneratorCm<T, E> {
    coroutine: Coroutine<Option<E>, T, Result<(), E>>,
    state: State,
}

impl<T, E> fmt::Debug for GeneratorCm<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorCm")
            .field("coroutine", &"<coroutine>")
            .field("state", &self.state)
            .finish()
    }
}

impl<T: 'static, E: 'static> GeneratorCm<T, E> {
    /// Wrap a two-phase coroutine body.
    ///
    /// Nothing runs until `enter`.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(Suspend<'_, T, E>) -> Result<(), E> + 'static,
    {
        let coroutine = Coroutine::new(move |yielder: &Yielder<Option<E>, T>, _: Option<E>| {
            body(Suspend { yielder })
        });
        GeneratorCm {
            coroutine,
            state: State::Fresh,
        }
    }
}

impl<T, E> GeneratorCm<T, E> {
    /// Returns `true` between a successful `enter` and `exit`.
    pub fn is_suspended(&self) -> bool {
        self.state == State::Suspended
    }
}

impl<T, E> ContextManager for GeneratorCm<T, E>
where
    E: Clone + From<GeneratorError>,
{
    type Value = T;
    type Error = E;

    fn enter(&mut self) -> Result<T, E> {
        if self.state != State::Fresh {
            return Err(GeneratorError::AlreadyEntered.into());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("resuming generator for setup");

        match self.coroutine.resume(None) {
            CoroutineResult::Yield(value) => {
                self.state = State::Suspended;
                Ok(value)
            }
            CoroutineResult::Return(result) => {
                self.state = State::Finished;
                result?;
                #[cfg(feature = "tracing")]
                tracing::debug!("generator finished without yielding");
                Err(GeneratorError::DidNotYield.into())
            }
        }
    }

    fn exit(mut self, error: Option<&E>) -> Exit<E> {
        if self.state != State::Suspended {
            return Exit::Failed(GeneratorError::NotSuspended.into());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(injected = error.is_some(), "resuming generator for cleanup");

        self.state = State::Finished;
        match self.coroutine.resume(error.cloned()) {
            CoroutineResult::Yield(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("generator yielded again during cleanup");
                Exit::Failed(GeneratorError::DidNotStop.into())
            }
            CoroutineResult::Return(Ok(())) => Exit::Handled,
            CoroutineResult::Return(Err(e)) => Exit::Failed(e),
        }
    }
}

impl<T, E> Drop for GeneratorCm<T, E> {
    fn drop(&mut self) {
        if self.state != State::Suspended {
            return;
        }
        self.state = State::Finished;
        let failed = match self.coroutine.resume(None) {
            CoroutineResult::Yield(_) => true,
            CoroutineResult::Return(result) => result.is_err(),
        };
        if failed {
            #[cfg(feature = "tracing")]
            tracing::warn!("generator dropped while suspended; cleanup failed");
            #[cfg(not(feature = "tracing"))]
            eprintln!("generator dropped while suspended; cleanup failed");
        }
    }
}

/// Turn a parametrized coroutine body into a factory of managers.
///
/// Every call of the returned function builds a fresh [`GeneratorCm`] around
/// a new run of `body`.
///
/// # Example
///
/// ```rust
/// use exitstack::{contextmanager, with, GeneratorError, Outcome, Suspend};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let tag = {
///     let log = log.clone();
///     contextmanager(move |name: &'static str, scope: Suspend<'_, &'static str, GeneratorError>| {
///         log.borrow_mut().push(format!("<{}>", name));
///         scope.suspend(name);
///         log.borrow_mut().push(format!("</{}>", name));
///         Ok::<(), GeneratorError>(())
///     })
/// };
///
/// let outcome = with(tag("h1"), |name| Ok(name.len()));
/// assert_eq!(outcome, Ok(Outcome::Completed(2)));
/// assert_eq!(*log.borrow(), vec!["<h1>", "</h1>"]);
/// ```
pub fn contextmanager<A, T, E, F>(body: F) -> impl Fn(A) -> GeneratorCm<T, E>
where
    F: Fn(A, Suspend<'_, T, E>) -> Result<(), E> + 'static,
    A: 'static,
    T: 'static,
    E: 'static,
{
    let body = Rc::new(body);
    move |args: A| {
        let body = Rc::clone(&body);
        GeneratorCm::new(move |scope| body(args, scope))
    }
}
