use proptest::prelude::*;
use things_core::engine::Engine;
use things_core::event::codec::{LogFormat, decode, encode};
use things_core::state::project;

use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn replay_is_deterministic(ops in arb_ops()) {
        let engine = build(&ops);
        let first = project(engine.log());
        let second = project(engine.log());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn incremental_equals_batch(ops in arb_ops()) {
        let engine = build(&ops);
        prop_assert_eq!(engine.project(), engine.state().clone());
    }

    #[test]
    fn invariants_hold_after_every_command(ops in arb_ops()) {
        let mut engine = Engine::new();
        for op in &ops {
            let before = engine.log().len();
            let result = run(&mut engine, op);
            if result.is_err() {
                prop_assert_eq!(engine.log().len(), before);
            }
            prop_assert_eq!(engine.state().check_invariants(), Ok(()));
        }
    }

    #[test]
    fn accepted_commands_emit_what_they_append(ops in arb_ops()) {
        let mut engine = Engine::new();
        for op in &ops {
            let before = engine.log().len();
            if let Ok(events) = run(&mut engine, op) {
                prop_assert!(!events.is_empty());
                prop_assert_eq!(engine.log().since(before), events.as_slice());
            }
        }
    }

    #[test]
    fn reorder_is_a_permutation(ops in arb_ops(), from in 0usize..5, to in 0usize..5) {
        let mut engine = build(&ops);
        let contexts: Vec<_> = engine.state().contexts.keys().cloned().collect();
        for context in contexts {
            let mut before = engine.state().contexts[&context].task_ids.clone();
            if engine.reorder_task_in_context(&context, from, to).is_ok() {
                let mut after = engine.state().contexts[&context].task_ids.clone();
                prop_assert_eq!(&after[to], &before[from]);
                before.sort();
                after.sort();
                prop_assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn command_logs_pass_validation(ops in arb_ops()) {
        let engine = build(&ops);
        let replayed = Engine::replay(engine.log().all().to_vec());
        prop_assert!(replayed.is_ok(), "{:?}", replayed.err());
    }

    #[test]
    fn encode_decode_preserves_log(ops in arb_ops()) {
        let engine = build(&ops);
        for format in [LogFormat::Lines, LogFormat::Json] {
            let bytes = encode(engine.log().all(), format).expect("encode");
            let decoded = decode(&bytes).expect("decode");
            prop_assert_eq!(decoded.as_slice(), engine.log().all());
        }
    }
}
