// ===================================================================
// FILE: runner.rs (tre-programs crate)
//
// DESC: Runs one sample function in the interpreter with a recording
//       host, and reports its result, output and peak call depth.
// ===================================================================

use tre_host_abi::{RecordingHostABI, RuntimeValue};
use tre_ir::{Program, Type};
use tre_vm::{VM, VMError};

use crate::Input;

/// Call depth the interpreter allows before reporting a stack overflow
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Everything observable about one execution of a sample
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub result: Result<RuntimeValue, VMError>,
    /// Text printed through the host functions
    pub output: String,
    /// Deepest call stack reached
    pub peak_depth: usize,
}

/// Run `function` of `program` with `inputs`
pub fn run(program: &Program, function: &str, inputs: &[Input]) -> Run {
    run_with_depth(program, function, inputs, DEFAULT_MAX_DEPTH)
}

pub fn run_with_depth(program: &Program, function: &str, inputs: &[Input], max_depth: usize) -> Run {
    let params = program
        .function(function)
        .map(|f| f.params.clone())
        .unwrap_or_default();

    let mut vm = VM::new(program.clone(), RecordingHostABI::new());
    vm.set_max_stack_depth(max_depth);

    let args = inputs
        .iter()
        .zip(params.iter().copied().chain(std::iter::repeat(Type::I32)))
        .map(|(input, ty)| match input {
            Input::Int(v) if ty == Type::I64 => RuntimeValue::I64(*v as i64),
            Input::Int(v) => RuntimeValue::I32(*v),
            Input::Array(values) => {
                let cells: Vec<RuntimeValue> = values.iter().map(|v| RuntimeValue::I32(*v)).collect();
                RuntimeValue::Ptr(vm.memory_mut().alloc_static(&cells, Type::I32.size_in_bytes()))
            }
        })
        .collect();

    let result = vm.call_function(function, args);
    Run {
        result,
        output: vm.host_mut().take_output(),
        peak_depth: vm.peak_depth(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd_sample() {
        let run = run(&crate::gcd(), "gcd", &[Input::Int(12), Input::Int(18)]);
        assert_eq!(run.result, Ok(RuntimeValue::I32(6)));
        assert!(run.peak_depth > 1);
    }

    #[test]
    fn test_print_arr_sample() {
        let run = run(
            &crate::print_arr(),
            "print_arr",
            &[Input::Array(vec![1, 2, 3, 4]), Input::Int(4)],
        );
        assert_eq!(run.result, Ok(RuntimeValue::Void));
        assert_eq!(run.output, "1 2 3 4 \n");
        assert_eq!(run.peak_depth, 5);
    }

    #[test]
    fn test_i64_parameters_are_widened() {
        let run = run(&crate::power(), "power", &[Input::Int(3), Input::Int(5)]);
        assert_eq!(run.result, Ok(RuntimeValue::I64(243)));
    }

    #[test]
    fn test_deep_recursion_overflows() {
        let run = run_with_depth(&crate::gcd_sub(), "gcd_sub", &[Input::Int(1000), Input::Int(1)], 50);
        assert_eq!(run.result, Err(VMError::StackOverflow(50)));
    }
}
