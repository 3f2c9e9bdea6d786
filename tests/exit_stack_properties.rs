//! Property-based tests for exit stack unwinding

use exitstack::testing::Journal;
use exitstack::{with, Exit, ExitStack, Outcome};
use proptest::prelude::*;

/// How a generated exit action answers.
#[derive(Clone, Debug, PartialEq)]
enum Reply {
    Pass,
    Handle,
    Fail(u32),
}

impl Reply {
    fn exit(&self) -> Exit<u32> {
        match self {
            Reply::Pass => Exit::NotHandled,
            Reply::Handle => Exit::Handled,
            Reply::Fail(code) => Exit::Failed(*code),
        }
    }
}

fn reply() -> impl Strategy<Value = Reply> {
    prop_oneof![
        4 => Just(Reply::Pass),
        1 => Just(Reply::Handle),
        1 => (1u32..1000).prop_map(Reply::Fail),
    ]
}

fn build<'a>(journal: &Journal, replies: &[Reply]) -> ExitStack<'a, u32> {
    let mut stack = ExitStack::new();
    for (i, reply) in replies.iter().enumerate() {
        stack.push_exit(journal.exit_fn(format!("a{}", i), reply.exit()));
    }
    stack
}

fn names(journal: &Journal) -> Vec<String> {
    journal
        .events()
        .into_iter()
        .map(|event| event.split('(').next().unwrap_or_default().to_string())
        .collect()
}

proptest! {
    #[test]
    fn prop_unwinds_in_reverse_order_exactly_once(
        replies in prop::collection::vec(reply(), 0..30),
        incoming in proptest::option::of(1000u32..2000),
    ) {
        let journal = Journal::new();
        let mut stack = build(&journal, &replies);

        let _ = stack.unwind(incoming.as_ref());

        let expected: Vec<String> = (0..replies.len()).rev().map(|i| format!("a{}", i)).collect();
        prop_assert_eq!(names(&journal), expected);
        prop_assert!(stack.is_empty());
    }

    #[test]
    fn prop_clean_unwind_passes_no_error(
        count in 0usize..30,
    ) {
        let journal = Journal::new();
        let mut stack = build(&journal, &vec![Reply::Pass; count]);

        prop_assert_eq!(stack.unwind(None), Exit::NotHandled);
        prop_assert!(journal.events().iter().all(|event| event.ends_with("()")));
        prop_assert_eq!(journal.len(), count);
    }

    #[test]
    fn prop_unhandled_error_propagates_unchanged(
        count in 0usize..30,
        error in 1000u32..2000,
    ) {
        let journal = Journal::new();
        let stack = build(&journal, &vec![Reply::Pass; count]);

        let outcome = with(stack, |()| Err::<(), _>(error));

        prop_assert_eq!(outcome, Err(error));
        let seen = format!("({})", error);
        prop_assert!(journal.events().iter().all(|event| event.ends_with(&seen)));
    }

    #[test]
    fn prop_handled_error_turns_rest_into_clean_exit(
        before in prop::collection::vec(Just(Reply::Pass), 0..10),
        after in prop::collection::vec(Just(Reply::Pass), 0..10),
        error in 1000u32..2000,
    ) {
        // Registration order: `before`, the handler, then `after`.
        let mut replies = before.clone();
        replies.push(Reply::Handle);
        replies.extend(after.iter().cloned());

        let journal = Journal::new();
        let mut stack = build(&journal, &replies);

        prop_assert_eq!(stack.unwind(Some(&error)), Exit::Handled);

        let events = journal.events();
        let (with_error, clean) = events.split_at(after.len() + 1);
        let seen = format!("({})", error);
        prop_assert!(with_error.iter().all(|event| event.ends_with(&seen)));
        prop_assert!(clean.iter().all(|event| event.ends_with("()")));
        prop_assert_eq!(clean.len(), before.len());
    }

    #[test]
    fn prop_first_failure_is_raised(
        replies in prop::collection::vec(
            prop_oneof![Just(Reply::Pass), (1u32..1000).prop_map(Reply::Fail)],
            1..30,
        ),
    ) {
        let first_failure = replies.iter().rev().find_map(|reply| match reply {
            Reply::Fail(code) => Some(*code),
            _ => None,
        });

        let journal = Journal::new();
        let mut stack = build(&journal, &replies);
        let result = stack.unwind(None);

        match first_failure {
            Some(code) => {
                prop_assert_eq!(result, Exit::Failed(code));
            }
            None => {
                prop_assert_eq!(result, Exit::NotHandled);
            }
        }
        prop_assert_eq!(journal.len(), replies.len());
    }

    #[test]
    fn prop_pop_all_preserves_unwind(
        replies in prop::collection::vec(reply(), 0..30),
        incoming in proptest::option::of(1000u32..2000),
    ) {
        let direct_journal = Journal::new();
        let mut direct = build(&direct_journal, &replies);
        let direct_result = direct.unwind(incoming.as_ref());

        let moved_journal = Journal::new();
        let mut original = build(&moved_journal, &replies);
        let mut moved = original.pop_all();

        prop_assert_eq!(original.unwind(incoming.as_ref()), Exit::from_suppressed(false));
        prop_assert!(moved_journal.is_empty());

        prop_assert_eq!(moved.unwind(incoming.as_ref()), direct_result);
        prop_assert_eq!(moved_journal.events(), direct_journal.events());
    }

    #[test]
    fn prop_with_stack_reports_suppression(
        error in 1000u32..2000,
        handle in any::<bool>(),
    ) {
        let journal = Journal::new();
        let reply = if handle { Reply::Handle } else { Reply::Pass };
        let stack = build(&journal, &[reply]);

        let outcome = with(stack, |()| Err::<(), _>(error));

        if handle {
            prop_assert_eq!(outcome, Ok(Outcome::Suppressed(error)));
        } else {
            prop_assert_eq!(outcome, Err(error));
        }
    }
}
