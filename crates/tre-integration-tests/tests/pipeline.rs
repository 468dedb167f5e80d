// ===================================================================
// FILE: pipeline.rs
//
// DESC: Pass-level behaviour across whole programs: options,
//       idempotence, rejections, and the shape of the rewritten IR.
// ===================================================================

use tre_integration_tests::{optimize, optimize_with};
use tre_ir::{Terminator, verify_function};
use tre_opt::{LOOP_HEAD_LABEL, PassOptions, TailRecursionElimination, eliminate_tail_recursion};

#[test]
fn test_running_twice_changes_nothing() {
    for sample in tre_programs::corpus() {
        let once = optimize(&sample.program);
        let twice = optimize(&once);
        assert_eq!(once, twice, "{}", sample.name);
    }
}

#[test]
fn test_changed_flag_matches_self_calls() {
    let pass = TailRecursionElimination::default();
    for sample in tre_programs::corpus() {
        let mut program = sample.program.clone();
        let before = program.functions[0].self_call_count();
        let changed = pass.run_on_function(&mut program.functions[0]);
        let after = program.functions[0].self_call_count();
        assert_eq!(changed, after < before, "{}", sample.name);
    }
}

#[test]
fn test_loop_head_follows_prologue() {
    let optimized = optimize(&tre_programs::gcd());
    let func = &optimized.functions[0];
    let head = func
        .blocks
        .iter()
        .find(|b| b.label == LOOP_HEAD_LABEL)
        .expect("no loop head");

    assert_eq!(func.entry().terminator, Terminator::Br { target: head.id });
    let back_edges = func
        .blocks
        .iter()
        .filter(|b| b.terminator == Terminator::Br { target: head.id })
        .count();
    // the entry fall-through plus the rewritten call
    assert_eq!(back_edges, 2);
    assert!(func.to_string().contains("br tailrecurse"));
}

#[test]
fn test_disabling_cross_jumps_keeps_retval_shape() {
    let options = PassOptions::default().with_cross_jumps(false);
    for program in [tre_programs::gcd(), tre_programs::factorial(), tre_programs::print_arr()] {
        assert_eq!(optimize_with(&program, options), program);
    }
    // sum_to returns straight from the call's block
    let sum_to = tre_programs::sum_to();
    assert_ne!(optimize_with(&sum_to, options), sum_to);
}

#[test]
fn test_disabling_accumulation() {
    let options = PassOptions::default().with_accumulation(false);
    let factorial = tre_programs::factorial();
    assert_eq!(optimize_with(&factorial, options), factorial);

    let gcd = tre_programs::gcd();
    assert_ne!(optimize_with(&gcd, options), gcd);
}

#[test]
fn test_every_rewritten_function_verifies() {
    for sample in tre_programs::corpus() {
        let mut program = sample.program;
        for func in &mut program.functions {
            if eliminate_tail_recursion(func) {
                assert_eq!(verify_function(func), Ok(()), "{}", func);
            }
        }
    }
}

#[test]
fn test_functions_processed_independently() {
    let mut program = tre_programs::gcd();
    program.functions.extend(tre_programs::factorial().functions);
    program.functions.extend(tre_programs::alternating().functions);

    let changed = TailRecursionElimination::default().run_on_program(&mut program);
    assert_eq!(changed, 2);
    assert_eq!(program.function("gcd").map(|f| f.self_call_count()), Some(0));
    assert_eq!(program.function("factorial").map(|f| f.self_call_count()), Some(0));
    assert_eq!(program.function("alternating").map(|f| f.self_call_count()), Some(1));
}
