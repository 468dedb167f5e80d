// ===================================================================
// FILE: properties.rs
//
// DESC: Property tests: the rewritten programs agree with the
//       originals and with plain Rust implementations.
// ===================================================================

use proptest::prelude::*;
use tre_host_abi::RuntimeValue;
use tre_integration_tests::{compare, optimize, reference_gcd};
use tre_programs::Input;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn gcd_agrees_with_euclid(a in 0i32..100_000, b in 0i32..100_000) {
        let comparison = compare(&tre_programs::gcd(), "gcd", &[Input::Int(a), Input::Int(b)]);
        prop_assert!(comparison.agrees());
        prop_assert_eq!(comparison.after.result, Ok(RuntimeValue::I32(reference_gcd(a, b))));
        prop_assert_eq!(comparison.after.peak_depth, 1);
    }

    #[test]
    fn sum_to_agrees_with_closed_form(n in 0i32..150) {
        let comparison = compare(&tre_programs::sum_to(), "sum_to", &[Input::Int(n)]);
        prop_assert!(comparison.agrees());
        prop_assert_eq!(comparison.after.result, Ok(RuntimeValue::I32(n * (n + 1) / 2)));
    }

    #[test]
    fn gcd_sub_has_unbounded_depth_after(a in 1i32..5_000, b in 1i32..5_000) {
        let program = optimize(&tre_programs::gcd_sub());
        let run = tre_programs::run(&program, "gcd_sub", &[Input::Int(a), Input::Int(b)]);
        prop_assert_eq!(run.result, Ok(RuntimeValue::I32(reference_gcd(a, b))));
        prop_assert_eq!(run.peak_depth, 1);
    }

    #[test]
    fn print_arr_prints_the_same(values in prop::collection::vec(-1000i32..1000, 0..40)) {
        let inputs = [Input::Array(values.clone()), Input::Int(values.len() as i32)];
        let comparison = compare(&tre_programs::print_arr(), "print_arr", &inputs);

        let expected: String = values.iter().map(|v| format!("{} ", v)).collect::<String>() + "\n";
        prop_assert!(comparison.agrees());
        prop_assert_eq!(comparison.after.output, expected);
    }

    #[test]
    fn fib_agrees(n in 0i32..18) {
        let comparison = compare(&tre_programs::fib(), "fib", &[Input::Int(n)]);
        prop_assert!(comparison.agrees());
    }
}
