//! Driving a single context manager around a body.
//!
//! [`with`] is the invocation entry point: enter, run the body, always exit.
//!
//! # Example
//!
//! ```rust
//! use exitstack::{from_fn, with, Exit, Outcome};
//!
//! let manager = from_fn(
//!     || Ok::<_, String>("conn"),
//!     |error: Option<&String>| Exit::from_suppressed(error.is_some()),
//! );
//!
//! let outcome = with(manager, |_conn| Err::<i32, _>("query failed".to_string()));
//! assert_eq!(outcome, Ok(Outcome::Suppressed("query failed".to_string())));
//! ```

use crate::manager::{ContextManager, Exit};

/// How a body run through [`with`] ended, when no error escaped.
///
/// # Variants
///
/// - `Completed` - The body returned normally
/// - `Suppressed` - The body failed and the manager handled the error
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome<T, E> {
    /// The body completed with this result.
    Completed(T),
    /// The body failed with this error, and exit suppressed it.
    Suppressed(E),
}

impl<T, E> Outcome<T, E> {
    /// Returns `true` if the body's error was suppressed.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Outcome::Suppressed(_))
    }

    /// Returns the body's result, if it completed.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Suppressed(_) => None,
        }
    }

    /// Returns the suppressed error, if any.
    pub fn suppressed(self) -> Option<E> {
        match self {
            Outcome::Suppressed(e) => Some(e),
            Outcome::Completed(_) => None,
        }
    }

    /// Maps the completed value using the provided function.
    pub fn map<F, U>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Suppressed(e) => Outcome::Suppressed(e),
        }
    }
}

/// Run `body` inside `manager`.
///
/// 1. `enter` the manager; an enter error propagates and `exit` is not called
/// 2. Run `body` with the entered value
/// 3. `exit` with the body's error, if any, and settle the result
///
/// When the body fails, the manager's answer decides what the caller sees:
/// `Handled` gives `Ok(Outcome::Suppressed(e))`, `NotHandled` gives back the
/// body's error unchanged, and `Failed(e2)` replaces it with `e2`. A clean
/// body whose exit fails also yields `Err`.
pub fn with<M, T, F>(mut manager: M, body: F) -> Result<Outcome<T, M::Error>, M::Error>
where
    M: ContextManager,
    F: FnOnce(M::Value) -> Result<T, M::Error>,
{
    let value = manager.enter()?;
    let result = body(value);
    settle(result, |error| manager.exit(error))
}

/// Combine a body result with the exit step that follows it.
pub(crate) fn settle<T, E, X>(result: Result<T, E>, exit: X) -> Result<Outcome<T, E>, E>
where
    X: FnOnce(Option<&E>) -> Exit<E>,
{
    match result {
        Ok(value) => match exit(None) {
            Exit::Failed(e) => Err(e),
            Exit::Handled | Exit::NotHandled => Ok(Outcome::Completed(value)),
        },
        Err(error) => match exit(Some(&error)) {
            Exit::Handled => Ok(Outcome::Suppressed(error)),
            Exit::NotHandled => Err(error),
            Exit::Failed(e) => Err(e),
        },
    }
}
