// ===================================================================
// FILE: lib.rs (tre-programs crate)
//
// DESC: Sample programs in the shape an unoptimized C front end lowers
//       them to: every parameter is spilled to a stack slot in the
//       entry block and every use reloads it. Functions that return a
//       value through several paths go through a `retval` slot and a
//       shared `return` block.
// ===================================================================

mod runner;

use tre_ir::{Program, Type};
use tre_ir_builder::ProgramBuilder;

pub use runner::{DEFAULT_MAX_DEPTH, Run, run, run_with_depth};

/// An argument to pass when running a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Int(i32),
    /// An i32 array placed in static memory and passed by pointer
    Array(Vec<i32>),
}

/// A sample program together with a representative invocation
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    pub program: Program,
    pub inputs: Vec<Input>,
}

/// Every sample, in the order the driver reports them
pub fn corpus() -> Vec<Sample> {
    vec![
        Sample {
            name: "gcd",
            description: "gcd(a, b) = b == 0 ? a : gcd(b, a % b)",
            program: gcd(),
            inputs: vec![Input::Int(12), Input::Int(18)],
        },
        Sample {
            name: "print_arr",
            description: "prints an array by recursing on its tail, returns void",
            program: print_arr(),
            inputs: vec![Input::Array(vec![1, 2, 3, 4]), Input::Int(4)],
        },
        Sample {
            name: "factorial",
            description: "factorial(n) = n <= 0 ? 1 : n * factorial(n - 1)",
            program: factorial(),
            inputs: vec![Input::Int(10)],
        },
        Sample {
            name: "factorial_acc",
            description: "factorial with an explicit accumulator parameter",
            program: factorial_acc(),
            inputs: vec![Input::Int(10), Input::Int(1)],
        },
        Sample {
            name: "sum_to",
            description: "sum_to(n) = n == 0 ? 0 : n + sum_to(n - 1), returned directly",
            program: sum_to(),
            inputs: vec![Input::Int(150)],
        },
        Sample {
            name: "sum_evens",
            description: "sums the even numbers up to n; odd n is a plain tail call, even n adds",
            program: sum_evens(),
            inputs: vec![Input::Int(50)],
        },
        Sample {
            name: "power",
            description: "power(b, e) = e == 0 ? 1 : b * power(b, e - 1)",
            program: power(),
            inputs: vec![Input::Int(3), Input::Int(5)],
        },
        Sample {
            name: "gcd_sub",
            description: "subtraction gcd with two tail-recursive call sites",
            program: gcd_sub(),
            inputs: vec![Input::Int(1000), Input::Int(1)],
        },
        Sample {
            name: "fib",
            description: "fib(n) = n < 2 ? n : fib(n - 1) + fib(n - 2)",
            program: fib(),
            inputs: vec![Input::Int(15)],
        },
        Sample {
            name: "alternating",
            description: "alternating(n) = n <= 0 ? 0 : n - alternating(n - 1)",
            program: alternating(),
            inputs: vec![Input::Int(9)],
        },
    ]
}

/// Look up a sample by name
pub fn sample(name: &str) -> Option<Sample> {
    corpus().into_iter().find(|s| s.name == name)
}

/// ```c
/// int gcd(int a, int b) {
///     if (b == 0) return a;
///     return gcd(b, a % b);
/// }
/// ```
pub fn gcd() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("gcd", vec![Type::I32, Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let if_then = fb.create_block("if.then");
        let if_end = fb.create_block("if.end");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[Type::I32]);
        let retval = slots.locals[0];
        let (a_addr, b_addr) = (slots.params[0], slots.params[1]);
        let b = fb.ins().load(Type::I32, b_addr);
        let zero = fb.ins().const_i32(0);
        let is_zero = fb.ins().cmp_eq(Type::I32, b, zero);
        fb.ins().br_if(is_zero, if_then, if_end);

        fb.switch_to_block(if_then);
        let a = fb.ins().load(Type::I32, a_addr);
        fb.ins().store(retval, a, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(if_end);
        let b = fb.ins().load(Type::I32, b_addr);
        let a = fb.ins().load(Type::I32, a_addr);
        let divisor = fb.ins().load(Type::I32, b_addr);
        let rem = fb.ins().rem(Type::I32, a, divisor);
        let call = fb.ins().call("gcd", vec![b, rem], Type::I32);
        fb.ins().store(retval, call, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        let value = fb.ins().load(Type::I32, retval);
        fb.ins().ret(Some(value));
    }
    builder.build()
}

/// ```c
/// void print_arr(int *arr, int n) {
///     if (n == 0) { printf("\n"); return; }
///     printf("%d ", arr[0]);
///     print_arr(arr + 1, n - 1);
/// }
/// ```
pub fn print_arr() -> Program {
    let mut builder = ProgramBuilder::new();
    builder.add_import("env", "print_i32", vec![Type::I32], Type::Void);
    builder.add_import("env", "print_char", vec![Type::I32], Type::Void);
    builder.add_import("env", "println", vec![], Type::Void);

    let idx = builder.create_function("print_arr", vec![Type::Ptr, Type::I32], Type::Void);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let if_then = fb.create_block("if.then");
        let if_end = fb.create_block("if.end");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let (arr_addr, n_addr) = (slots.params[0], slots.params[1]);
        let n = fb.ins().load(Type::I32, n_addr);
        let zero = fb.ins().const_i32(0);
        let empty = fb.ins().cmp_eq(Type::I32, n, zero);
        fb.ins().br_if(empty, if_then, if_end);

        fb.switch_to_block(if_then);
        fb.ins().call_void("println", vec![]);
        fb.ins().jump(ret);

        fb.switch_to_block(if_end);
        let arr = fb.ins().load(Type::Ptr, arr_addr);
        let head = fb.ins().load(Type::I32, arr);
        fb.ins().call_void("print_i32", vec![head]);
        let space = fb.ins().const_i32(' ' as i32);
        fb.ins().call_void("print_char", vec![space]);
        let arr = fb.ins().load(Type::Ptr, arr_addr);
        let stride = fb.ins().const_i64(Type::I32.size_in_bytes() as i64);
        let rest = fb.ins().ptr_add(arr, stride);
        let n = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let remaining = fb.ins().sub(Type::I32, n, one);
        fb.ins().call_void("print_arr", vec![rest, remaining]);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        fb.ins().ret(None);
    }
    builder.build()
}

/// ```c
/// int factorial(int n) {
///     if (n <= 0) return 1;
///     return n * factorial(n - 1);
/// }
/// ```
pub fn factorial() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("factorial", vec![Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let if_then = fb.create_block("if.then");
        let if_end = fb.create_block("if.end");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[Type::I32]);
        let retval = slots.locals[0];
        let n_addr = slots.params[0];
        let n = fb.ins().load(Type::I32, n_addr);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_le(Type::I32, n, zero);
        fb.ins().br_if(done, if_then, if_end);

        fb.switch_to_block(if_then);
        let one = fb.ins().const_i32(1);
        fb.ins().store(retval, one, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(if_end);
        let n = fb.ins().load(Type::I32, n_addr);
        let m = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, m, one);
        let call = fb.ins().call("factorial", vec![next], Type::I32);
        let product = fb.ins().mul(Type::I32, n, call);
        fb.ins().store(retval, product, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        let value = fb.ins().load(Type::I32, retval);
        fb.ins().ret(Some(value));
    }
    builder.build()
}

/// ```c
/// int factorial_acc(int n, int acc) {
///     if (n <= 0) return acc;
///     return factorial_acc(n - 1, n * acc);
/// }
/// ```
pub fn factorial_acc() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("factorial_acc", vec![Type::I32, Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let if_then = fb.create_block("if.then");
        let if_end = fb.create_block("if.end");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[Type::I32]);
        let retval = slots.locals[0];
        let (n_addr, acc_addr) = (slots.params[0], slots.params[1]);
        let n = fb.ins().load(Type::I32, n_addr);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_le(Type::I32, n, zero);
        fb.ins().br_if(done, if_then, if_end);

        fb.switch_to_block(if_then);
        let acc = fb.ins().load(Type::I32, acc_addr);
        fb.ins().store(retval, acc, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(if_end);
        let n = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let n = fb.ins().load(Type::I32, n_addr);
        let acc = fb.ins().load(Type::I32, acc_addr);
        let product = fb.ins().mul(Type::I32, n, acc);
        let call = fb.ins().call("factorial_acc", vec![next, product], Type::I32);
        fb.ins().store(retval, call, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        let value = fb.ins().load(Type::I32, retval);
        fb.ins().ret(Some(value));
    }
    builder.build()
}

/// Returns straight out of both branches, without a `retval` slot.
///
/// ```c
/// int sum_to(int n) {
///     if (n == 0) return 0;
///     return n + sum_to(n - 1);
/// }
/// ```
pub fn sum_to() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("sum_to", vec![Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let base = fb.create_block("base");
        let recurse = fb.create_block("recurse");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let n_addr = slots.params[0];
        let n = fb.ins().load(Type::I32, n_addr);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_eq(Type::I32, n, zero);
        fb.ins().br_if(done, base, recurse);

        fb.switch_to_block(base);
        let zero = fb.ins().const_i32(0);
        fb.ins().ret(Some(zero));

        fb.switch_to_block(recurse);
        let n = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let call = fb.ins().call("sum_to", vec![next], Type::I32);
        let sum = fb.ins().add(Type::I32, n, call);
        fb.ins().ret(Some(sum));
    }
    builder.build()
}

/// One plain tail call and one that needs an accumulator, the plain one
/// first in block order.
///
/// ```c
/// int sum_evens(int n) {
///     if (n == 0) return 0;
///     if (n % 2) return sum_evens(n - 1);
///     return n + sum_evens(n - 1);
/// }
/// ```
pub fn sum_evens() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("sum_evens", vec![Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let base = fb.create_block("base");
        let step = fb.create_block("step");
        let odd = fb.create_block("odd");
        let even = fb.create_block("even");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let n_addr = slots.params[0];
        let n = fb.ins().load(Type::I32, n_addr);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_eq(Type::I32, n, zero);
        fb.ins().br_if(done, base, step);

        fb.switch_to_block(base);
        let zero = fb.ins().const_i32(0);
        fb.ins().ret(Some(zero));

        fb.switch_to_block(step);
        let n = fb.ins().load(Type::I32, n_addr);
        let two = fb.ins().const_i32(2);
        let parity = fb.ins().rem(Type::I32, n, two);
        fb.ins().br_if(parity, odd, even);

        fb.switch_to_block(odd);
        let n = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let call = fb.ins().call("sum_evens", vec![next], Type::I32);
        fb.ins().ret(Some(call));

        fb.switch_to_block(even);
        let n = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let call = fb.ins().call("sum_evens", vec![next], Type::I32);
        let sum = fb.ins().add(Type::I32, n, call);
        fb.ins().ret(Some(sum));
    }
    builder.build()
}

/// ```c
/// long power(long b, int e) {
///     if (e == 0) return 1;
///     return b * power(b, e - 1);
/// }
/// ```
pub fn power() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("power", vec![Type::I64, Type::I32], Type::I64);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let if_then = fb.create_block("if.then");
        let if_end = fb.create_block("if.end");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[Type::I64]);
        let retval = slots.locals[0];
        let (b_addr, e_addr) = (slots.params[0], slots.params[1]);
        let e = fb.ins().load(Type::I32, e_addr);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_eq(Type::I32, e, zero);
        fb.ins().br_if(done, if_then, if_end);

        fb.switch_to_block(if_then);
        let one = fb.ins().const_i64(1);
        fb.ins().store(retval, one, Type::I64);
        fb.ins().jump(ret);

        fb.switch_to_block(if_end);
        let b = fb.ins().load(Type::I64, b_addr);
        let b_arg = fb.ins().load(Type::I64, b_addr);
        let e = fb.ins().load(Type::I32, e_addr);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, e, one);
        let call = fb.ins().call("power", vec![b_arg, next], Type::I64);
        let product = fb.ins().mul(Type::I64, b, call);
        fb.ins().store(retval, product, Type::I64);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        let value = fb.ins().load(Type::I64, retval);
        fb.ins().ret(Some(value));
    }
    builder.build()
}

/// ```c
/// int gcd_sub(int a, int b) {
///     if (a == b) return a;
///     if (b < a) return gcd_sub(a - b, b);
///     return gcd_sub(a, b - a);
/// }
/// ```
pub fn gcd_sub() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("gcd_sub", vec![Type::I32, Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let if_then = fb.create_block("if.then");
        let if_else = fb.create_block("if.else");
        let shrink_a = fb.create_block("shrink.a");
        let shrink_b = fb.create_block("shrink.b");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[Type::I32]);
        let retval = slots.locals[0];
        let (a_addr, b_addr) = (slots.params[0], slots.params[1]);
        let a = fb.ins().load(Type::I32, a_addr);
        let b = fb.ins().load(Type::I32, b_addr);
        let equal = fb.ins().cmp_eq(Type::I32, a, b);
        fb.ins().br_if(equal, if_then, if_else);

        fb.switch_to_block(if_then);
        let a = fb.ins().load(Type::I32, a_addr);
        fb.ins().store(retval, a, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(if_else);
        let a = fb.ins().load(Type::I32, a_addr);
        let b = fb.ins().load(Type::I32, b_addr);
        let b_smaller = fb.ins().cmp_lt(Type::I32, b, a);
        fb.ins().br_if(b_smaller, shrink_a, shrink_b);

        fb.switch_to_block(shrink_a);
        let a = fb.ins().load(Type::I32, a_addr);
        let b = fb.ins().load(Type::I32, b_addr);
        let diff = fb.ins().sub(Type::I32, a, b);
        let b = fb.ins().load(Type::I32, b_addr);
        let call = fb.ins().call("gcd_sub", vec![diff, b], Type::I32);
        fb.ins().store(retval, call, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(shrink_b);
        let a = fb.ins().load(Type::I32, a_addr);
        let b = fb.ins().load(Type::I32, b_addr);
        let a_again = fb.ins().load(Type::I32, a_addr);
        let diff = fb.ins().sub(Type::I32, b, a_again);
        let call = fb.ins().call("gcd_sub", vec![a, diff], Type::I32);
        fb.ins().store(retval, call, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        let value = fb.ins().load(Type::I32, retval);
        fb.ins().ret(Some(value));
    }
    builder.build()
}

/// Only the second call is in accumulating position; the first stays
/// a genuine recursive call.
///
/// ```c
/// int fib(int n) {
///     if (n < 2) return n;
///     return fib(n - 1) + fib(n - 2);
/// }
/// ```
pub fn fib() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("fib", vec![Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let if_then = fb.create_block("if.then");
        let if_end = fb.create_block("if.end");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[Type::I32]);
        let retval = slots.locals[0];
        let n_addr = slots.params[0];
        let n = fb.ins().load(Type::I32, n_addr);
        let two = fb.ins().const_i32(2);
        let small = fb.ins().cmp_lt(Type::I32, n, two);
        fb.ins().br_if(small, if_then, if_end);

        fb.switch_to_block(if_then);
        let n = fb.ins().load(Type::I32, n_addr);
        fb.ins().store(retval, n, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(if_end);
        let n = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let first = fb.ins().sub(Type::I32, n, one);
        let left = fb.ins().call("fib", vec![first], Type::I32);
        let n = fb.ins().load(Type::I32, n_addr);
        let two = fb.ins().const_i32(2);
        let second = fb.ins().sub(Type::I32, n, two);
        let right = fb.ins().call("fib", vec![second], Type::I32);
        let sum = fb.ins().add(Type::I32, left, right);
        fb.ins().store(retval, sum, Type::I32);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        let value = fb.ins().load(Type::I32, retval);
        fb.ins().ret(Some(value));
    }
    builder.build()
}

/// Subtraction does not reassociate, so this one must be left alone.
///
/// ```c
/// int alternating(int n) {
///     if (n <= 0) return 0;
///     return n - alternating(n - 1);
/// }
/// ```
pub fn alternating() -> Program {
    let mut builder = ProgramBuilder::new();
    let idx = builder.create_function("alternating", vec![Type::I32], Type::I32);
    {
        let mut fb = builder.function_builder(idx);
        let entry = fb.create_block("entry");
        let base = fb.create_block("base");
        let recurse = fb.create_block("recurse");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let n_addr = slots.params[0];
        let n = fb.ins().load(Type::I32, n_addr);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_le(Type::I32, n, zero);
        fb.ins().br_if(done, base, recurse);

        fb.switch_to_block(base);
        let zero = fb.ins().const_i32(0);
        fb.ins().ret(Some(zero));

        fb.switch_to_block(recurse);
        let n = fb.ins().load(Type::I32, n_addr);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let call = fb.ins().call("alternating", vec![next], Type::I32);
        let diff = fb.ins().sub(Type::I32, n, call);
        fb.ins().ret(Some(diff));
    }
    builder.build()
}
