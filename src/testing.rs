//! Testing utilities for code built on context managers.
//!
//! This module provides an event recorder for asserting cleanup order and
//! assertion macros for [`with`](crate::with) results.
//!
//! # Examples
//!
//! ## Journal
//!
//! ```rust
//! use exitstack::testing::Journal;
//! use exitstack::{Exit, ExitStack};
//!
//! let journal = Journal::new();
//! let mut stack: ExitStack<'_, String> = ExitStack::new();
//! stack.callback(journal.callback("close file"));
//! stack.push_exit(journal.exit_fn("release lock", Exit::NotHandled));
//!
//! assert!(stack.close().is_ok());
//! assert_eq!(journal.events(), vec!["release lock()", "close file"]);
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use exitstack::{assert_completed, assert_suppressed, suppress, null_context, with};
//!
//! assert_completed!(with(null_context::<_, String>(1), |n| Ok(n + 1)), 2);
//! assert_suppressed!(with(suppress(|_: &String| true), |()| Err::<(), _>("x".to_string())));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::manager::Exit;

/// Shared, cloneable log of events.
///
/// Clones append to the same log, so a journal can be moved into callbacks
/// and coroutines that outlive the current borrow.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Rc<RefCell<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Cleanup callback that records `name` and succeeds.
    pub fn callback<E: 'static>(&self, name: impl Into<String>) -> impl FnOnce() -> Result<(), E> {
        let journal = self.clone();
        let name = name.into();
        move || {
            journal.record(name);
            Ok(())
        }
    }

    /// Cleanup callback that records `name` and fails with `error`.
    pub fn failing_callback<E: 'static>(
        &self,
        name: impl Into<String>,
        error: E,
    ) -> impl FnOnce() -> Result<(), E> {
        let journal = self.clone();
        let name = name.into();
        move || {
            journal.record(name);
            Err(error)
        }
    }

    /// Exit callable that records `name(error)` and answers with `reply`.
    ///
    /// A clean exit is recorded as `name()`.
    pub fn exit_fn<E>(
        &self,
        name: impl Into<String>,
        reply: Exit<E>,
    ) -> impl FnOnce(Option<&E>) -> Exit<E>
    where
        E: fmt::Display + 'static,
    {
        let journal = self.clone();
        let name = name.into();
        move |error: Option<&E>| {
            match error {
                Some(e) => journal.record(format!("{}({})", name, e)),
                None => journal.record(format!("{}()", name)),
            }
            reply
        }
    }
}

/// Assert that a [`with`](crate::with) call completed without error.
///
/// Optionally compares the completed value.
///
/// # Example
///
/// ```rust
/// use exitstack::{assert_completed, null_context, with};
///
/// assert_completed!(with(null_context::<_, String>(2), |n| Ok(n * 2)), 4);
/// ```
#[macro_export]
macro_rules! assert_completed {
    ($result:expr) => {
        match $result {
            Ok($crate::Outcome::Completed(_)) => {}
            Ok($crate::Outcome::Suppressed(e)) => {
                panic!("Expected Completed, got Suppressed: {:?}", e);
            }
            Err(e) => {
                panic!("Expected Completed, got Err: {:?}", e);
            }
        }
    };
    ($result:expr, $expected:expr) => {
        match $result {
            Ok($crate::Outcome::Completed(value)) => {
                assert_eq!(value, $expected);
            }
            Ok($crate::Outcome::Suppressed(e)) => {
                panic!("Expected Completed, got Suppressed: {:?}", e);
            }
            Err(e) => {
                panic!("Expected Completed, got Err: {:?}", e);
            }
        }
    };
}

/// Assert that a [`with`](crate::with) call ended with a suppressed error.
///
/// Optionally compares the suppressed error.
///
/// # Example
///
/// ```rust
/// use exitstack::{assert_suppressed, suppress, with};
///
/// let outcome = with(suppress(|e: &i32| *e == 7), |()| Err::<(), _>(7));
/// assert_suppressed!(outcome, 7);
/// ```
#[macro_export]
macro_rules! assert_suppressed {
    ($result:expr) => {
        match $result {
            Ok($crate::Outcome::Suppressed(_)) => {}
            Ok($crate::Outcome::Completed(v)) => {
                panic!("Expected Suppressed, got Completed: {:?}", v);
            }
            Err(e) => {
                panic!("Expected Suppressed, got Err: {:?}", e);
            }
        }
    };
    ($result:expr, $expected:expr) => {
        match $result {
            Ok($crate::Outcome::Suppressed(e)) => {
                assert_eq!(e, $expected);
            }
            Ok($crate::Outcome::Completed(v)) => {
                panic!("Expected Suppressed, got Completed: {:?}", v);
            }
            Err(e) => {
                panic!("Expected Suppressed, got Err: {:?}", e);
            }
        }
    };
}
