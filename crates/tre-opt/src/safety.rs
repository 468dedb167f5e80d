// ===================================================================
// FILE: safety.rs (tre-opt crate)
//
// DESC: Decides whether a function's stack frame can be reused as-is
//       by every iteration of the loop the rewrite introduces.
// ===================================================================

use std::collections::HashSet;

use tre_ir::{AllocaCount, Function, Instruction, ValueId};

use crate::error::UnsafeFrame;

/// True if reusing the frame across iterations is sound. See [`check_function`].
pub fn is_function_rewrite_safe(func: &Function) -> bool {
    check_function(func).is_ok()
}

/// Every alloca must sit in the entry block with a static size, and its
/// address may only ever be loaded from or stored to. Variadic functions
/// are rejected outright.
pub fn check_function(func: &Function) -> Result<(), UnsafeFrame> {
    if func.is_variadic {
        return Err(UnsafeFrame::Variadic);
    }

    let mut slots = HashSet::new();
    for block in &func.blocks {
        for instr in &block.instructions {
            let Instruction::Alloca { dest, count, .. } = instr else {
                continue;
            };
            if block.id != func.entry_block {
                return Err(UnsafeFrame::AllocaOutsideEntry {
                    value: *dest,
                    block: block.label.clone(),
                });
            }
            if let AllocaCount::Dynamic(_) = count {
                return Err(UnsafeFrame::DynamicAlloca { value: *dest });
            }
            slots.insert(*dest);
        }
    }

    for block in &func.blocks {
        for instr in &block.instructions {
            if let Some(slot) = escaping_operand(instr, &slots) {
                return Err(UnsafeFrame::EscapingSlot {
                    slot,
                    user: instr.to_string(),
                });
            }
        }
        let escaping = block
            .terminator
            .operands()
            .into_iter()
            .find(|v| slots.contains(v));
        if let Some(slot) = escaping {
            return Err(UnsafeFrame::EscapingSlot {
                slot,
                user: format!("terminator of '{}'", block.label),
            });
        }
    }

    Ok(())
}

/// A slot used anywhere other than a load source or store target
fn escaping_operand(instr: &Instruction, slots: &HashSet<ValueId>) -> Option<ValueId> {
    match instr {
        Instruction::Load { .. } => None,
        Instruction::Store { value, .. } => slots.contains(value).then_some(*value),
        other => other.operands().into_iter().find(|v| slots.contains(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use tre_ir::Type;

    #[test]
    fn test_prologue_functions_are_safe() {
        for program in [tre_programs::gcd(), tre_programs::print_arr(), tre_programs::fib()] {
            assert_eq!(check_function(&program.functions[0]), Ok(()));
        }
    }

    #[test]
    fn test_variadic_rejected() {
        let func = fixtures::variadic_countdown();
        assert_eq!(check_function(&func), Err(UnsafeFrame::Variadic));
        assert!(!is_function_rewrite_safe(&func));
    }

    #[test]
    fn test_dynamic_alloca_rejected() {
        let func = fixtures::dynamic_alloca();
        assert!(matches!(
            check_function(&func),
            Err(UnsafeFrame::DynamicAlloca { .. })
        ));
    }

    #[test]
    fn test_alloca_outside_entry_rejected() {
        let func = fixtures::alloca_in_loop_body();
        assert!(matches!(
            check_function(&func),
            Err(UnsafeFrame::AllocaOutsideEntry { ref block, .. }) if block == "recurse"
        ));
    }

    #[test]
    fn test_slot_passed_to_call_escapes() {
        let func = fixtures::escaping_slot();
        let Err(UnsafeFrame::EscapingSlot { user, .. }) = check_function(&func) else {
            panic!("expected an escaping slot");
        };
        assert!(user.contains("call consume"), "unexpected user: {}", user);
    }

    #[test]
    fn test_slot_stored_as_value_escapes() {
        let mut func = Function::new("leak".to_string(), vec![], Type::Void);
        let entry = func.add_block("entry");
        let a = func.next_value();
        let b = func.next_value();
        let block = func.block_mut(entry);
        block.instructions.push(Instruction::Alloca {
            dest: a,
            ty: Type::Ptr,
            count: AllocaCount::Static(1),
        });
        block.instructions.push(Instruction::Alloca {
            dest: b,
            ty: Type::I32,
            count: AllocaCount::Static(1),
        });
        block.instructions.push(Instruction::Store {
            address: a,
            value: b,
            ty: Type::Ptr,
            volatile: false,
        });

        assert_eq!(
            check_function(&func),
            Err(UnsafeFrame::EscapingSlot {
                slot: b,
                user: format!("ptr.store {}, {}", a, b),
            })
        );
    }

    #[test]
    fn test_slot_returned_escapes() {
        let mut func = Function::new("addr".to_string(), vec![], Type::Ptr);
        let entry = func.add_block("entry");
        let slot = func.next_value();
        let block = func.block_mut(entry);
        block.instructions.push(Instruction::Alloca {
            dest: slot,
            ty: Type::I32,
            count: AllocaCount::Static(1),
        });
        block.terminator = tre_ir::Terminator::Ret { value: Some(slot) };

        assert!(matches!(
            check_function(&func),
            Err(UnsafeFrame::EscapingSlot { user, .. }) if user == "terminator of 'entry'"
        ));
    }
}
