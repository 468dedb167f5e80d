// ===================================================================
// FILE: lib.rs (tre-integration-tests crate)
//
// DESC: Shared harness for the end-to-end tests: run a program in the
//       interpreter, eliminate tail recursion, run it again.
// ===================================================================

use tre_ir::Program;
use tre_opt::{PassOptions, TailRecursionElimination};
use tre_programs::{Input, Run};

/// A copy of `program` with the pass applied to every function
pub fn optimize(program: &Program) -> Program {
    optimize_with(program, PassOptions::default())
}

pub fn optimize_with(program: &Program, options: PassOptions) -> Program {
    let mut optimized = program.clone();
    TailRecursionElimination::new(options).run_on_program(&mut optimized);
    optimized
}

/// Runs of the same call before and after the pass
#[derive(Debug)]
pub struct Comparison {
    pub before: Run,
    pub after: Run,
}

impl Comparison {
    /// Same result and same output
    pub fn agrees(&self) -> bool {
        self.before.result == self.after.result && self.before.output == self.after.output
    }
}

pub fn compare(program: &Program, function: &str, inputs: &[Input]) -> Comparison {
    Comparison {
        before: tre_programs::run(program, function, inputs),
        after: tre_programs::run(&optimize(program), function, inputs),
    }
}

/// Euclid's algorithm, for checking the interpreted versions
pub fn reference_gcd(mut a: i32, mut b: i32) -> i32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

pub fn reference_factorial(n: i32) -> i32 {
    (1..=n.max(0)).fold(1i32, |acc, k| acc.wrapping_mul(k))
}
