//! Iterator adapter over a context manager.
//!
//! [`using`] exposes a manager as a one-item iterator: the first `next()`
//! enters, the second exits. Dropping the iterator while it is entered also
//! exits, so `for` loops and early `break`s release the resource. Exit never
//! sees an error here and cannot suppress anything.
//!
//! ```rust
//! use exitstack::{null_context, using};
//!
//! for value in using(null_context::<_, String>(3)) {
//!     assert_eq!(value, Ok(3));
//! }
//! ```

use std::fmt;

use crate::manager::{ContextManager, Exit};

enum State<M> {
    Fresh(M),
    Entered(M),
    Done,
}

/// One-item iterator that enters a manager and then exits it.
///
/// Created by [`using`].
pub struct Use<M: ContextManager> {
    state: State<M>,
}

impl<M: ContextManager> fmt::Debug for Use<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Fresh(_) => "fresh",
            State::Entered(_) => "entered",
            State::Done => "done",
        };
        f.debug_struct("Use").field("state", &state).finish()
    }
}

/// Iterate over the single value a manager produces.
pub fn using<M: ContextManager>(manager: M) -> Use<M> {
    Use {
        state: State::Fresh(manager),
    }
}

impl<M: ContextManager> Iterator for Use<M> {
    type Item = Result<M::Value, M::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Fresh(mut manager) => match manager.enter() {
                Ok(value) => {
                    self.state = State::Entered(manager);
                    Some(Ok(value))
                }
                Err(e) => Some(Err(e)),
            },
            State::Entered(manager) => match manager.exit(None) {
                Exit::Failed(e) => Some(Err(e)),
                Exit::Handled | Exit::NotHandled => None,
            },
            State::Done => None,
        }
    }
}

impl<M: ContextManager> Drop for Use<M> {
    fn drop(&mut self) {
        if let State::Entered(manager) = std::mem::replace(&mut self.state, State::Done) {
            if manager.exit(None).is_failed() {
                #[cfg(feature = "tracing")]
                tracing::warn!("context manager dropped while entered; exit failed");
                #[cfg(not(feature = "tracing"))]
                eprintln!("context manager dropped while entered; exit failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::from_fn;
    use std::cell::RefCell;

    fn recorded<'a>(
        log: &'a RefCell<Vec<&'static str>>,
        enter: Result<i32, String>,
        exit: Exit<String>,
    ) -> impl ContextManager<Value = i32, Error = String> + 'a {
        from_fn(
            move || {
                log.borrow_mut().push("enter");
                enter.clone()
            },
            move |error: Option<&String>| {
                assert!(error.is_none(), "using never passes an error");
                log.borrow_mut().push("exit");
                exit
            },
        )
    }

    #[test]
    fn yields_value_then_exits() {
        let log = RefCell::new(Vec::new());
        let mut iter = using(recorded(&log, Ok(1), Exit::NotHandled));

        assert_eq!(iter.next(), Some(Ok(1)));
        assert_eq!(*log.borrow(), vec!["enter"]);
        assert_eq!(iter.next(), None);
        assert_eq!(*log.borrow(), vec!["enter", "exit"]);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn for_loop_exits_once() {
        let log = RefCell::new(Vec::new());
        let values: Vec<_> = using(recorded(&log, Ok(2), Exit::NotHandled)).collect();

        assert_eq!(values, vec![Ok(2)]);
        assert_eq!(*log.borrow(), vec!["enter", "exit"]);
    }

    #[test]
    fn enter_failure_skips_exit() {
        let log = RefCell::new(Vec::new());
        let values: Vec<_> =
            using(recorded(&log, Err("refused".to_string()), Exit::NotHandled)).collect();

        assert_eq!(values, vec![Err("refused".to_string())]);
        assert_eq!(*log.borrow(), vec!["enter"]);
    }

    #[test]
    fn exit_failure_is_yielded() {
        let log = RefCell::new(Vec::new());
        let values: Vec<_> = using(recorded(
            &log,
            Ok(3),
            Exit::Failed("close failed".to_string()),
        ))
        .collect();

        assert_eq!(values, vec![Ok(3), Err("close failed".to_string())]);
    }

    #[test]
    fn handled_does_not_suppress_anything() {
        let log = RefCell::new(Vec::new());
        let values: Vec<_> = using(recorded(&log, Ok(4), Exit::Handled)).collect();

        assert_eq!(values, vec![Ok(4)]);
    }

    #[test]
    fn drop_while_entered_exits() {
        let log = RefCell::new(Vec::new());
        for value in using(recorded(&log, Ok(5), Exit::NotHandled)) {
            assert_eq!(value, Ok(5));
            break;
        }
        assert_eq!(*log.borrow(), vec!["enter", "exit"]);
    }

    #[test]
    fn drop_before_enter_does_nothing() {
        let log = RefCell::new(Vec::new());
        drop(using(recorded(&log, Ok(6), Exit::NotHandled)));
        assert!(log.borrow().is_empty());
    }
}
