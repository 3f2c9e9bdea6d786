//! A stack of exit actions unwound in reverse order.
//!
//! [`ExitStack`] collects any number of cleanups, decided at runtime, and
//! unwinds them last-in first-out with a single error-handling pass:
//!
//! - every action runs exactly once, even when an earlier one failed
//! - the first failure during unwind is the one reported
//! - an action that handles the error turns the rest of the unwind into a
//!   clean exit, but a later failure still escapes
//!
//! The stack is itself a [`ContextManager`], so stacks nest and can be driven
//! by [`with`](crate::with).
//!
//! # Example
//!
//! ```rust
//! use exitstack::{from_fn, with, Exit, ExitStack, Outcome};
//! use std::cell::RefCell;
//!
//! let log = RefCell::new(Vec::new());
//! let mut stack = ExitStack::new();
//!
//! for name in ["db", "cache", "file"] {
//!     let log = &log;
//!     stack.enter_context(from_fn(
//!         move || Ok::<_, String>(name),
//!         move |_: Option<&String>| {
//!             log.borrow_mut().push(name);
//!             Exit::NotHandled
//!         },
//!     ))?;
//! }
//!
//! assert_eq!(with(stack, |()| Ok(())), Ok(Outcome::Completed(())));
//! assert_eq!(*log.borrow(), vec!["file", "cache", "db"]);
//! # Ok::<(), String>(())
//! ```

use std::fmt;

use crate::manager::{ContextManager, Exit};
use crate::with::{settle, Outcome};

type CallbackFn<'a, E> = Box<dyn FnOnce() -> Result<(), E> + 'a>;
type ExitFn<'a, E> = Box<dyn FnOnce(Option<&E>) -> Exit<E> + 'a>;

/// One registered cleanup.
enum ExitAction<'a, E> {
    /// Plain cleanup; never sees the error and never handles it.
    Callback(CallbackFn<'a, E>),
    /// Bound `exit` of a manager, or a raw exit callable.
    Exit(ExitFn<'a, E>),
}

impl<E> ExitAction<'_, E> {
    fn run(self, error: Option<&E>) -> Exit<E> {
        match self {
            ExitAction::Callback(f) => Exit::from_cleanup(f()),
            ExitAction::Exit(f) => f(error),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ExitAction::Callback(_) => "callback",
            ExitAction::Exit(_) => "exit",
        }
    }
}

/// Ordered collection of exit actions, unwound LIFO.
///
/// # Example
///
/// ```rust
/// use exitstack::{Exit, ExitStack};
///
/// let mut stack: ExitStack<'_, String> = ExitStack::new();
/// stack.callback(|| Ok(()));
/// stack.push_exit(|error: Option<&String>| Exit::from_suppressed(error.is_some()));
///
/// assert_eq!(stack.len(), 2);
/// assert_eq!(stack.unwind(Some(&"boom".to_string())), Exit::Handled);
/// assert!(stack.is_empty());
/// ```
pub struct ExitStack<'a, E> {
    actions: Vec<ExitAction<'a, E>>,
}

impl<E> fmt::Debug for ExitStack<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.actions.iter().map(ExitAction::kind).collect();
        f.debug_struct("ExitStack").field("actions", &kinds).finish()
    }
}

impl<E> Default for ExitStack<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, E> ExitStack<'a, E> {
    /// Create an empty stack.
    pub fn new() -> Self {
        ExitStack {
            actions: Vec::new(),
        }
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Register a plain cleanup.
    ///
    /// The callback never sees the in-flight error and cannot handle it; an
    /// `Err` it returns is an unwind failure like any other.
    pub fn callback<F>(&mut self, f: F)
    where
        F: FnOnce() -> Result<(), E> + 'a,
    {
        self.actions.push(ExitAction::Callback(Box::new(f)));
    }

    /// Register a raw exit callable.
    pub fn push_exit<F>(&mut self, f: F)
    where
        F: FnOnce(Option<&E>) -> Exit<E> + 'a,
    {
        self.actions.push(ExitAction::Exit(Box::new(f)));
    }

    /// Register the `exit` of a manager that was already entered elsewhere.
    pub fn push<M>(&mut self, manager: M)
    where
        M: ContextManager<Error = E> + 'a,
    {
        self.push_exit(move |error| manager.exit(error));
    }

    /// Enter `manager` and register its `exit`.
    ///
    /// When `enter` fails nothing is registered and the error is returned.
    pub fn enter_context<M>(&mut self, mut manager: M) -> Result<M::Value, E>
    where
        M: ContextManager<Error = E> + 'a,
    {
        let value = manager.enter()?;
        self.push(manager);
        Ok(value)
    }

    /// Move every registered action into a new stack, leaving this one empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exitstack::ExitStack;
    ///
    /// let mut stack: ExitStack<'_, String> = ExitStack::new();
    /// stack.callback(|| Ok(()));
    ///
    /// let committed = stack.pop_all();
    /// assert!(stack.is_empty());
    /// assert_eq!(committed.len(), 1);
    /// ```
    pub fn pop_all(&mut self) -> ExitStack<'a, E> {
        ExitStack {
            actions: std::mem::take(&mut self.actions),
        }
    }

    /// Unwind every action, newest first, and leave the stack empty.
    ///
    /// `error` is the in-flight error, if any. The result is `Failed` with the
    /// first failure that is still pending at the end, `Handled` if an incoming
    /// error was handled, and `NotHandled` otherwise.
    pub fn unwind(&mut self, error: Option<&E>) -> Exit<E> {
        let has_error = error.is_some();
        let mut suppressed = false;
        let mut pending: Option<E> = None;

        #[cfg(feature = "tracing")]
        tracing::trace!(actions = self.actions.len(), has_error, "unwinding exit stack");

        while let Some(action) = self.actions.pop() {
            let current = match pending.as_ref() {
                Some(failure) => Some(failure),
                None if suppressed => None,
                None => error,
            };

            match action.run(current) {
                Exit::Handled => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(position = self.actions.len(), "exit action handled the error");
                    suppressed = true;
                    pending = None;
                }
                Exit::NotHandled => {}
                Exit::Failed(failure) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(position = self.actions.len(), "exit action failed");
                    suppressed = false;
                    if pending.is_none() {
                        pending = Some(failure);
                    } else {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            position = self.actions.len(),
                            "discarding exit failure; an earlier failure is pending"
                        );
                    }
                }
            }
        }

        match pending {
            Some(failure) => Exit::Failed(failure),
            None => Exit::from_suppressed(has_error && suppressed),
        }
    }

    /// Unwind as a clean exit.
    pub fn close(mut self) -> Result<(), E> {
        self.unwind(None).into_result().map(|_| ())
    }

    /// Run `body` against a fresh stack, then unwind it.
    ///
    /// The body can register cleanups as it goes; its result settles the same
    /// way [`with`](crate::with) settles a body.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exitstack::{ExitStack, Outcome};
    /// use std::cell::Cell;
    ///
    /// let closed = Cell::new(0);
    /// let outcome = ExitStack::scope(|stack| {
    ///     for _ in 0..3 {
    ///         stack.callback(|| {
    ///             closed.set(closed.get() + 1);
    ///             Ok::<_, String>(())
    ///         });
    ///     }
    ///     Ok(stack.len())
    /// });
    ///
    /// assert_eq!(outcome, Ok(Outcome::Completed(3)));
    /// assert_eq!(closed.get(), 3);
    /// ```
    pub fn scope<T, F>(body: F) -> Result<Outcome<T, E>, E>
    where
        F: FnOnce(&mut ExitStack<'a, E>) -> Result<T, E>,
    {
        let mut stack = ExitStack::new();
        let result = body(&mut stack);
        settle(result, |error| stack.unwind(error))
    }
}

impl<E> ContextManager for ExitStack<'_, E> {
    type Value = ();
    type Error = E;

    fn enter(&mut self) -> Result<(), E> {
        Ok(())
    }

    fn exit(mut self, error: Option<&E>) -> Exit<E> {
        self.unwind(error)
    }
}

impl<E> Drop for ExitStack<'_, E> {
    fn drop(&mut self) {
        if self.actions.is_empty() {
            return;
        }

        let registered = self.actions.len();
        if let Exit::Failed(_) = self.unwind(None) {
            #[cfg(feature = "tracing")]
            tracing::warn!(registered, "exit stack dropped without exit; cleanup failed");
            #[cfg(not(feature = "tracing"))]
            eprintln!(
                "exit stack dropped without exit; cleanup of {} action(s) failed",
                registered
            );
        }
    }
}
