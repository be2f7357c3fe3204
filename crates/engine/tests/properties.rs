//! Property tests for context tracking and evaluation.

mod common;

use binlua_engine::{ExecuteResult, Selection};
use proptest::prelude::*;

use common::session;

#[derive(Debug, Clone)]
enum Setter {
    Address(u64),
    Selection(u64, u64),
}

fn setter() -> impl Strategy<Value = Setter> {
    prop_oneof![
        (0u64..64).prop_map(Setter::Address),
        (0u64..64, 0u64..64).prop_map(|(a, b)| Setter::Selection(a, b)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn selection_length_never_negative(a in any::<u64>(), b in any::<u64>()) {
        let expected = if b > a { b - a } else { 0 };
        prop_assert_eq!(Selection::new(a, b).length(), expected);
    }

    #[test]
    fn repeating_the_committed_context_is_not_a_change(setters in prop::collection::vec(setter(), 1..8)) {
        let (session, _console) = session();
        for s in &setters {
            match s {
                Setter::Address(a) => session.set_current_address(*a),
                Setter::Selection(a, b) => session.set_current_selection(*a, *b),
            }
        }
        session.execute_script_input("");
        prop_assert!(!session.has_context_changed());

        // Replaying the same setters restores the same values.
        for s in &setters {
            match s {
                Setter::Address(a) => session.set_current_address(*a),
                Setter::Selection(a, b) => session.set_current_selection(*a, *b),
            }
        }
        prop_assert!(!session.has_context_changed());
    }

    #[test]
    fn integer_expressions_print_their_value(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        let (session, console) = session();
        let result = session.execute_script_input(&format!("{} + ({})", a, b));
        prop_assert_eq!(result, ExecuteResult::Successful);
        prop_assert_eq!(console.outputs(), vec![(a + b).to_string()]);
    }

    #[test]
    fn doubly_invalid_input_emits_one_error(name in "[a-z]{3,10}") {
        let (session, console) = session();
        let input = format!("undefined_{}()", name);
        prop_assert_eq!(session.execute_script_input(&input), ExecuteResult::InvalidInput);
        prop_assert_eq!(console.errors().len(), 1);
    }
}
