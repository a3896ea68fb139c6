use proptest::prelude::*;
use stackbee_vm::{
    decode_identifier, evaluate, parse, Rational, SymExpr, SymbolicInterpreter,
};

fn initial_stack() -> impl Strategy<Value = Vec<Rational>> {
    prop::collection::vec((-20i64..20).prop_map(Rational::int), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 1024,
        .. ProptestConfig::default()
    })]

    #[test]
    fn lower_bound_never_exceeds_concrete_length(
        id in "[0-9a-e]{1,5}(f[0-9a-f][0-9a-e]{0,3}){0,2}",
        depth in 0usize..3,
        initial in initial_stack(),
    ) {
        let program = decode_identifier(&id).expect("generated ids are well formed");
        let symbolic = SymbolicInterpreter::new(&program).origin_depth(depth).run();
        let concrete = evaluate(&program, &initial);
        prop_assert!(
            symbolic.len_lower_bound() <= concrete.len(),
            "{id}: bound {} > length {}", symbolic.len_lower_bound(), concrete.len()
        );
    }

    #[test]
    fn identity_top_means_previous_term(
        id in "[0-9a-e]{1,6}",
        initial in prop::collection::vec((1i64..20).prop_map(Rational::int), 1..5),
    ) {
        let program = decode_identifier(&id).expect("generated ids are well formed");
        let symbolic = SymbolicInterpreter::new(&program).run();
        let concrete = evaluate(&program, &initial);
        if let (Some(top), Some(last)) = (symbolic.top_of_stack(), concrete.last()) {
            if top.as_single() == Some(&SymExpr::Top(0)) {
                prop_assert_eq!(last, initial.last().expect("non-empty"));
            }
            if let Some(value) = top.as_single().and_then(SymExpr::as_literal) {
                prop_assert_eq!(*last, value);
            }
        }
    }
}

#[test]
fn test_known_programs_respect_lower_bound() {
    let programs = [
        "len 2 * 1 - 2 * * len 1 + /",
        "dup 2 % bgtz 5 2 / 1 bgtz 4 3 * 1 +",
        "swap",
        "+ + +",
        "len bgtz 1 +",
        "bgtz 4 2 1 bgtz 1 3",
    ];
    let stacks: [&[i64]; 4] = [&[], &[1], &[3, 10], &[1, 1, 2, 5]];
    for text in programs {
        let program = parse(text).unwrap();
        let bound = SymbolicInterpreter::new(&program).run().len_lower_bound();
        for stack in stacks {
            let initial: Vec<Rational> = stack.iter().map(|&v| Rational::int(v)).collect();
            assert!(bound <= evaluate(&program, &initial).len(), "{text} on {stack:?}");
        }
    }
}
