// ===================================================================
// FILE: fixtures.rs (tre-opt crate)
//
// DESC: Small hand-built functions for the pass's edge cases.
// ===================================================================

use tre_ir::*;
use tre_ir_builder::{FunctionBuilder, Prologue};

/// Block of `func` labelled `label`
pub fn block_labelled(func: &Function, label: &str) -> BlockId {
    func.blocks
        .iter()
        .find(|b| b.label == label)
        .map(|b| b.id)
        .unwrap_or_else(|| panic!("no block labelled {}", label))
}

/// `name(n) = n == 0 ? 0 : <after>(name(n - 1))` in prologue form.
/// `before` runs at the top of the recursive block; `after` runs right
/// after the call and yields the returned value.
fn countdown_with(
    name: &str,
    before: impl FnOnce(&mut FunctionBuilder<'_>, &Prologue),
    after: impl FnOnce(&mut FunctionBuilder<'_>, ValueId, ValueId) -> ValueId,
) -> Function {
    let mut func = Function::new(name.to_string(), vec![Type::I32], Type::I32);
    {
        let mut fb = FunctionBuilder::new(&mut func);
        let entry = fb.create_block("entry");
        let base = fb.create_block("base");
        let recurse = fb.create_block("recurse");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_eq(Type::I32, n, zero);
        fb.ins().br_if(done, base, recurse);

        fb.switch_to_block(base);
        let zero = fb.ins().const_i32(0);
        fb.ins().ret(Some(zero));

        fb.switch_to_block(recurse);
        before(&mut fb, &slots);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let call = fb.ins().call(name, vec![next], Type::I32);
        let value = after(&mut fb, n, call);
        fb.ins().ret(Some(value));
    }
    func
}

pub fn countdown() -> Function {
    countdown_with("countdown", |_, _| {}, |_, _, call| call)
}

pub fn variadic_countdown() -> Function {
    let mut func = countdown();
    func.is_variadic = true;
    func
}

pub fn dynamic_alloca() -> Function {
    countdown_with(
        "dynamic_alloca",
        |fb, slots| {
            let n = fb.ins().load(Type::I32, slots.params[0]);
            fb.ins().alloca_n(Type::I32, AllocaCount::Dynamic(n));
        },
        |_, _, call| call,
    )
}

pub fn alloca_in_loop_body() -> Function {
    countdown_with(
        "alloca_in_loop_body",
        |fb, _| {
            fb.ins().alloca(Type::I32);
        },
        |_, _, call| call,
    )
}

/// Hands the address of its parameter slot to another function
pub fn escaping_slot() -> Function {
    countdown_with(
        "escaping_slot",
        |fb, slots| fb.ins().call_void("consume", vec![slots.params[0]]),
        |_, _, call| call,
    )
}

pub fn volatile_after_call() -> Function {
    let mut func = countdown_with("volatile_after_call", |_, _| {}, |_, _, call| call);
    let recurse = block_labelled(&func, "recurse");
    let slot = ValueId(1);
    let dest = func.next_value();
    func.block_mut(recurse).instructions.push(Instruction::Load {
        dest,
        ty: Type::I32,
        address: slot,
        volatile: true,
    });
    func
}

/// The call's block branches on a value computed before the call
pub fn branch_after_call() -> Function {
    let mut func = countdown_with("branch_after_call", |_, _| {}, |_, _, call| call);
    let base = block_labelled(&func, "base");
    let recurse = block_labelled(&func, "recurse");
    let block = func.block_mut(recurse);
    let cond = block.instructions[0].dest().unwrap();
    block.terminator = Terminator::BrIf {
        cond,
        true_target: base,
        false_target: base,
    };
    func
}

/// `call; br done; done: ret call` reads the call result in another block
pub fn call_result_used_after_jump() -> Function {
    let mut func = countdown_with("call_result_used_after_jump", |_, _| {}, |_, _, call| call);
    let recurse = block_labelled(&func, "recurse");
    let done = func.add_block("done");
    let returned = std::mem::replace(
        &mut func.block_mut(recurse).terminator,
        Terminator::Br { target: done },
    );
    func.block_mut(done).terminator = returned;
    func
}

/// `t = n + call; ret call`
pub fn accumulator_dropped() -> Function {
    countdown_with(
        "accumulator_dropped",
        |_, _| {},
        |fb, n, call| {
            fb.ins().add(Type::I32, n, call);
            call
        },
    )
}

/// `k = 2; ret k * call`, with `k` defined after the call
pub fn late_operand() -> Function {
    countdown_with(
        "late_operand",
        |_, _| {},
        |fb, _, call| {
            let k = fb.ins().const_i32(2);
            fb.ins().mul(Type::I32, k, call)
        },
    )
}

/// Stages the call result through two slots
pub fn double_store() -> Function {
    let mut func = Function::new("double_store".to_string(), vec![Type::I32], Type::I32);
    {
        let mut fb = FunctionBuilder::new(&mut func);
        let entry = fb.create_block("entry");
        let base = fb.create_block("base");
        let recurse = fb.create_block("recurse");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[Type::I32, Type::I32]);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_eq(Type::I32, n, zero);
        fb.ins().br_if(done, base, recurse);

        fb.switch_to_block(base);
        let zero = fb.ins().const_i32(0);
        fb.ins().ret(Some(zero));

        fb.switch_to_block(recurse);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let call = fb.ins().call("double_store", vec![next], Type::I32);
        fb.ins().store(slots.locals[0], call, Type::I32);
        fb.ins().store(slots.locals[1], call, Type::I32);
        let value = fb.ins().load(Type::I32, slots.locals[1]);
        fb.ins().ret(Some(value));
    }
    func
}

/// `scale(n) = n <= 0 ? 1.0 : 2.0 * scale(n - 1)` over f64
pub fn float_scale() -> Function {
    let mut func = Function::new("float_scale".to_string(), vec![Type::I32], Type::F64);
    {
        let mut fb = FunctionBuilder::new(&mut func);
        let entry = fb.create_block("entry");
        let base = fb.create_block("base");
        let recurse = fb.create_block("recurse");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_le(Type::I32, n, zero);
        fb.ins().br_if(done, base, recurse);

        fb.switch_to_block(base);
        let one = fb.ins().iconst(Type::F64, 1);
        fb.ins().ret(Some(one));

        fb.switch_to_block(recurse);
        let two = fb.ins().iconst(Type::F64, 2);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        let call = fb.ins().call("float_scale", vec![next], Type::F64);
        let scaled = fb.ins().mul(Type::F64, two, call);
        fb.ins().ret(Some(scaled));
    }
    func
}

/// A tail call in the entry block itself: `f(n) = f(n)` after a prologue
pub fn entry_block_call() -> Function {
    let mut func = Function::new("spin".to_string(), vec![Type::I32], Type::I32);
    {
        let mut fb = FunctionBuilder::new(&mut func);
        let entry = fb.create_block("entry");
        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let call = fb.ins().call("spin", vec![n], Type::I32);
        fb.ins().ret(Some(call));
    }
    func
}

/// Parameters used directly, never spilled
pub fn without_prologue() -> Function {
    let mut func = Function::new("gcd".to_string(), vec![Type::I32, Type::I32], Type::I32);
    {
        let mut fb = FunctionBuilder::new(&mut func);
        let entry = fb.create_block("entry");
        let base = fb.create_block("base");
        let recurse = fb.create_block("recurse");
        let (a, b) = (fb.param(0), fb.param(1));

        fb.switch_to_block(entry);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_eq(Type::I32, b, zero);
        fb.ins().br_if(done, base, recurse);

        fb.switch_to_block(base);
        fb.ins().ret(Some(a));

        fb.switch_to_block(recurse);
        let rem = fb.ins().rem(Type::I32, a, b);
        let call = fb.ins().call("gcd", vec![b, rem], Type::I32);
        fb.ins().ret(Some(call));
    }
    func
}

/// An extra alloca after the parameter stores
pub fn late_alloca() -> Function {
    let mut func = countdown();
    let dest = func.next_value();
    let entry = func.entry_block;
    // entry: alloca, store, <here>, ...
    func.block_mut(entry).instructions.insert(
        2,
        Instruction::Alloca {
            dest,
            ty: Type::I32,
            count: AllocaCount::Static(1),
        },
    );
    func
}

/// Compares the raw parameter as well as spilling it
pub fn param_reused() -> Function {
    let mut func = countdown();
    let param = func.param_value(0);
    let entry = func.entry_block;
    for instr in &mut func.block_mut(entry).instructions {
        if let Instruction::BinaryOp { lhs, .. } = instr {
            *lhs = param;
        }
    }
    func
}

/// Two void self-calls in a row, each in tail position of its own path
pub fn two_void_sites() -> Function {
    let mut func = Function::new("walk".to_string(), vec![Type::I32], Type::Void);
    {
        let mut fb = FunctionBuilder::new(&mut func);
        let entry = fb.create_block("entry");
        let stop = fb.create_block("stop");
        let step = fb.create_block("step");
        let odd = fb.create_block("odd");
        let even = fb.create_block("even");
        let ret = fb.create_block("return");

        fb.switch_to_block(entry);
        let slots = fb.prologue(&[]);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let zero = fb.ins().const_i32(0);
        let done = fb.ins().cmp_le(Type::I32, n, zero);
        fb.ins().br_if(done, stop, step);

        fb.switch_to_block(stop);
        fb.ins().jump(ret);

        fb.switch_to_block(step);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let two = fb.ins().const_i32(2);
        let parity = fb.ins().rem(Type::I32, n, two);
        fb.ins().br_if(parity, odd, even);

        fb.switch_to_block(odd);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let one = fb.ins().const_i32(1);
        let next = fb.ins().sub(Type::I32, n, one);
        fb.ins().call_void("walk", vec![next]);
        fb.ins().jump(ret);

        fb.switch_to_block(even);
        let n = fb.ins().load(Type::I32, slots.params[0]);
        let two = fb.ins().const_i32(2);
        let next = fb.ins().sub(Type::I32, n, two);
        fb.ins().call_void("walk", vec![next]);
        fb.ins().jump(ret);

        fb.switch_to_block(ret);
        fb.ins().ret(None);
    }
    func
}
