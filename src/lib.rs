//! # Exitstack
//!
//! > *"Whatever goes in, comes out"*
//!
//! A Rust library for scoped resources: enter a resource, run a body, and
//! guarantee cleanup on every exit path, with cleanup free to handle or
//! replace an in-flight error.
//!
//! ## Building Blocks
//!
//! - [`ContextManager`] - the `enter`/`exit` contract every resource implements
//! - [`with`] - drive one manager around a body
//! - [`ExitStack`] - any number of cleanups, unwound last-in first-out
//! - [`GeneratorCm`] / [`contextmanager`] - a two-phase coroutine as a manager
//! - [`using`] - a manager as a one-item iterator
//!
//! ## Quick Example
//!
//! ```rust
//! use exitstack::{contextmanager, with, ExitStack, GeneratorError, Outcome, Suspend};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let connect = {
//!     let log = log.clone();
//!     contextmanager(move |host: &'static str, scope: Suspend<'_, String, GeneratorError>| {
//!         log.borrow_mut().push(format!("connect {}", host));
//!         scope.suspend(format!("conn:{}", host));
//!         log.borrow_mut().push(format!("disconnect {}", host));
//!         Ok(())
//!     })
//! };
//!
//! let mut stack = ExitStack::new();
//! for host in ["alpha", "beta"] {
//!     stack.enter_context(connect(host))?;
//! }
//!
//! assert_eq!(with(stack, |()| Ok(())), Ok(Outcome::Completed(())));
//! assert_eq!(
//!     *log.borrow(),
//!     vec!["connect alpha", "connect beta", "disconnect beta", "disconnect alpha"]
//! );
//! # Ok::<(), GeneratorError>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod exit_stack;
pub mod generator;
pub mod manager;
pub mod testing;
pub mod using;
pub mod with;

// Re-exports
pub use exit_stack::ExitStack;
pub use generator::{contextmanager, GeneratorCm, GeneratorError, Suspend};
pub use manager::{from_fn, null_context, suppress, ContextManager, Exit};
pub use using::{using, Use};
pub use with::{with, Outcome};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::exit_stack::ExitStack;
    pub use crate::generator::{contextmanager, GeneratorCm, GeneratorError, Suspend};
    pub use crate::manager::{from_fn, null_context, suppress, ContextManager, Exit};
    pub use crate::using::using;
    pub use crate::with::{with, Outcome};
}
