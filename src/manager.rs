//! The context manager contract and a few small managers built on it.
//!
//! A [`ContextManager`] is anything with a paired `enter`/`exit`:
//!
//! - [`ContextManager::enter`] acquires the resource and hands out a value
//! - [`ContextManager::exit`] releases it, optionally handling an in-flight error
//!
//! `exit` reports what it did with the error through [`Exit`], a tagged result
//! that replaces the usual "did you suppress it" boolean.
//!
//! # Example
//!
//! ```rust
//! use exitstack::{from_fn, with, Exit, Outcome};
//!
//! let manager = from_fn(
//!     || Ok::<_, String>(vec![1, 2, 3]),
//!     |_error: Option<&String>| Exit::NotHandled,
//! );
//!
//! let outcome = with(manager, |items| Ok(items.len()));
//! assert_eq!(outcome, Ok(Outcome::Completed(3)));
//! ```

use std::fmt;

// ============================================================================
// Exit
// ============================================================================

/// What an exit step did with the error it was given.
///
/// # Variants
///
/// - `Handled` - The passed error is suppressed and must not propagate
/// - `NotHandled` - Cleanup ran; any passed error keeps propagating
/// - `Failed` - The exit step itself failed with a new error
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exit<E> {
    /// The error passed to `exit` was handled and must not propagate.
    Handled,
    /// Cleanup completed without handling the passed error.
    NotHandled,
    /// Cleanup itself failed.
    Failed(E),
}

impl<E> Exit<E> {
    /// Build an exit signal from a suppression flag.
    ///
    /// ```rust
    /// use exitstack::Exit;
    ///
    /// assert_eq!(Exit::<String>::from_suppressed(true), Exit::Handled);
    /// assert_eq!(Exit::<String>::from_suppressed(false), Exit::NotHandled);
    /// ```
    pub fn from_suppressed(suppressed: bool) -> Self {
        if suppressed {
            Exit::Handled
        } else {
            Exit::NotHandled
        }
    }

    /// Lift a cleanup result into an exit signal that never handles.
    pub fn from_cleanup(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Exit::NotHandled,
            Err(e) => Exit::Failed(e),
        }
    }

    /// Returns `true` if the error was handled.
    pub fn is_handled(&self) -> bool {
        matches!(self, Exit::Handled)
    }

    /// Returns `true` if the exit step failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Exit::Failed(_))
    }

    /// Returns the failure, if any.
    pub fn failure(&self) -> Option<&E> {
        match self {
            Exit::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Convert into `Ok(suppressed)` or `Err(failure)`.
    ///
    /// ```rust
    /// use exitstack::Exit;
    ///
    /// assert_eq!(Exit::<&str>::Handled.into_result(), Ok(true));
    /// assert_eq!(Exit::Failed("boom").into_result(), Err("boom"));
    /// ```
    pub fn into_result(self) -> Result<bool, E> {
        match self {
            Exit::Handled => Ok(true),
            Exit::NotHandled => Ok(false),
            Exit::Failed(e) => Err(e),
        }
    }

    /// Maps the failure type using the provided function.
    pub fn map_err<F, E2>(self, f: F) -> Exit<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Exit::Handled => Exit::Handled,
            Exit::NotHandled => Exit::NotHandled,
            Exit::Failed(e) => Exit::Failed(f(e)),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Exit<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::Handled => write!(f, "handled"),
            Exit::NotHandled => write!(f, "not handled"),
            Exit::Failed(e) => write!(f, "exit failed: {}", e),
        }
    }
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<E> Arbitrary for Exit<E>
where
    E: Arbitrary + Clone + 'static,
{
    type Parameters = E::Parameters;
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(Exit::Handled),
            Just(Exit::NotHandled),
            any_with::<E>(args).prop_map(Exit::Failed),
        ]
        .boxed()
    }
}

// ============================================================================
// ContextManager
// ============================================================================

/// A resource with a paired acquire (`enter`) and release (`exit`).
///
/// `exit` takes the manager by value, so it runs at most once. Whoever calls
/// `enter` successfully owes exactly one call to `exit`, whether or not the
/// work in between failed. When `enter` fails nothing was acquired and `exit`
/// must not be called.
///
/// # Example
///
/// ```rust
/// use exitstack::{with, ContextManager, Exit, Outcome};
///
/// struct Lock<'a> {
///     held: &'a std::cell::Cell<bool>,
/// }
///
/// impl ContextManager for Lock<'_> {
///     type Value = ();
///     type Error = String;
///
///     fn enter(&mut self) -> Result<(), String> {
///         self.held.set(true);
///         Ok(())
///     }
///
///     fn exit(self, _error: Option<&String>) -> Exit<String> {
///         self.held.set(false);
///         Exit::NotHandled
///     }
/// }
///
/// let held = std::cell::Cell::new(false);
/// let outcome = with(Lock { held: &held }, |()| Ok(held.get()));
/// assert_eq!(outcome, Ok(Outcome::Completed(true)));
/// assert!(!held.get());
/// ```
pub trait ContextManager {
    /// The value handed to the body by `enter`.
    type Value;

    /// The error type shared by `enter`, the body and `exit`.
    type Error;

    /// Acquire the resource.
    fn enter(&mut self) -> Result<Self::Value, Self::Error>;

    /// Release the resource.
    ///
    /// `error` is `None` on a clean exit and `Some` when the body failed.
    fn exit(self, error: Option<&Self::Error>) -> Exit<Self::Error>;
}

// ============================================================================
// FnManager - closure-built manager
// ============================================================================

/// Context manager assembled from an enter closure and an exit closure.
///
/// Created by [`from_fn`].
pub struct FnManager<Enter, Leave> {
    enter: Enter,
    exit: Leave,
}

impl<Enter, Leave> fmt::Debug for FnManager<Enter, Leave> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnManager")
            .field("enter", &"<function>")
            .field("exit", &"<function>")
            .finish()
    }
}

impl<Enter, Leave, T, E> ContextManager for FnManager<Enter, Leave>
where
    Enter: FnMut() -> Result<T, E>,
    Leave: FnOnce(Option<&E>) -> Exit<E>,
{
    type Value = T;
    type Error = E;

    fn enter(&mut self) -> Result<T, E> {
        (self.enter)()
    }

    fn exit(self, error: Option<&E>) -> Exit<E> {
        (self.exit)(error)
    }
}

/// Build a context manager from a pair of closures.
///
/// # Example
///
/// ```rust
/// use exitstack::{from_fn, with, Exit, Outcome};
///
/// let manager = from_fn(
///     || Ok::<_, String>(21),
///     |_: Option<&String>| Exit::NotHandled,
/// );
/// assert_eq!(with(manager, |n| Ok(n * 2)), Ok(Outcome::Completed(42)));
/// ```
pub fn from_fn<Enter, Leave, T, E>(enter: Enter, exit: Leave) -> FnManager<Enter, Leave>
where
    Enter: FnMut() -> Result<T, E>,
    Leave: FnOnce(Option<&E>) -> Exit<E>,
{
    FnManager { enter, exit }
}

// ============================================================================
// Suppress
// ============================================================================

/// Context manager that handles errors matching a predicate.
///
/// Created by [`suppress`].
pub struct Suppress<P, E> {
    predicate: P,
    _error: std::marker::PhantomData<fn(&E)>,
}

impl<P, E> fmt::Debug for Suppress<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suppress")
            .field("predicate", &"<function>")
            .finish()
    }
}

impl<P, E> ContextManager for Suppress<P, E>
where
    P: Fn(&E) -> bool,
{
    type Value = ();
    type Error = E;

    fn enter(&mut self) -> Result<(), E> {
        Ok(())
    }

    fn exit(self, error: Option<&E>) -> Exit<E> {
        match error {
            Some(e) if (self.predicate)(e) => Exit::Handled,
            _ => Exit::NotHandled,
        }
    }
}

/// Handle any error for which `predicate` returns `true`.
///
/// ```rust
/// use exitstack::{suppress, with, Outcome};
///
/// let outcome = with(suppress(|e: &String| e.starts_with("missing")), |()| {
///     Err::<(), _>("missing file".to_string())
/// });
/// assert_eq!(outcome, Ok(Outcome::Suppressed("missing file".to_string())));
/// ```
pub fn suppress<P, E>(predicate: P) -> Suppress<P, E>
where
    P: Fn(&E) -> bool,
{
    Suppress {
        predicate,
        _error: std::marker::PhantomData,
    }
}

// ============================================================================
// NullContext
// ============================================================================

/// Context manager that hands out a value and does nothing on exit.
///
/// Created by [`null_context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullContext<T, E> {
    value: T,
    _error: std::marker::PhantomData<fn() -> E>,
}

impl<T: Clone, E> ContextManager for NullContext<T, E> {
    type Value = T;
    type Error = E;

    fn enter(&mut self) -> Result<T, E> {
        Ok(self.value.clone())
    }

    fn exit(self, _error: Option<&E>) -> Exit<E> {
        Exit::NotHandled
    }
}

/// A stand-in manager for code paths that optionally need a real one.
pub fn null_context<T: Clone, E>(value: T) -> NullContext<T, E> {
    NullContext {
        value,
        _error: std::marker::PhantomData,
    }
}
