// ===================================================================
// FILE: transform.rs (tre-opt crate)
//
// DESC: Structural rewrite of a proven tail call. The read-only
//       functions (`match_prologue`, `check_call_site`) decide whether
//       the rewrite can go ahead; the mutating ones cannot fail, so a
//       function is either left alone or rewritten completely.
// ===================================================================

use tre_ir::{AllocaCount, BlockId, Function, Instruction, Terminator, ValueId};

use crate::accumulate::Accumulator;
use crate::error::{PrologueMismatch, RewriteError};
use crate::locate::CallSite;

/// Label of the block every eliminated call branches back to
pub const LOOP_HEAD_LABEL: &str = "tailrecurse";

/// The entry block's parameter-spilling prologue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrologueMatch {
    /// First instruction after the prologue
    pub split_at: usize,
    /// Slot each parameter is stored into, in declaration order
    pub slots: Vec<ValueId>,
}

/// Where the loop starts and where each parameter lives across iterations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlots {
    pub loop_head: BlockId,
    pub slots: Vec<ValueId>,
}

/// Match the entry block against `allocas; store p0; store p1; ...`.
/// Each store must be non-volatile, target one of the leading allocas,
/// and be the only use of its parameter. No alloca may follow.
pub fn match_prologue(func: &Function) -> Result<PrologueMatch, PrologueMismatch> {
    let entry = func.entry();
    let allocas: Vec<ValueId> = entry
        .instructions
        .iter()
        .map_while(|instr| match instr {
            Instruction::Alloca { dest, .. } => Some(*dest),
            _ => None,
        })
        .collect();

    let mut slots = Vec::with_capacity(func.params.len());
    for index in 0..func.params.len() {
        let position = allocas.len() + index;
        let param = func.param_value(index);
        let address = match entry.instructions.get(position) {
            Some(Instruction::Store {
                address,
                value,
                volatile: false,
                ..
            }) if *value == param => *address,
            _ => return Err(PrologueMismatch::MissingParamStore { index, position }),
        };
        if !allocas.contains(&address) {
            return Err(PrologueMismatch::NotASlot { index, address });
        }
        let uses = func.use_count(param);
        if uses != 1 {
            return Err(PrologueMismatch::ParamReused { index, uses });
        }
        slots.push(address);
    }

    let split_at = allocas.len() + func.params.len();
    let late = entry.instructions[split_at..]
        .iter()
        .find_map(|instr| match instr {
            Instruction::Alloca { dest, .. } => Some(*dest),
            _ => None,
        });
    if let Some(value) = late {
        return Err(PrologueMismatch::LateAlloca { value });
    }

    Ok(PrologueMatch { split_at, slots })
}

/// Confirm `call` still names a self-call whose arguments line up with
/// `slot_count` parameter slots
pub fn check_call_site(func: &Function, call: &CallSite, slot_count: usize) -> Result<(), RewriteError> {
    let callee = func
        .block(call.block)
        .instructions
        .get(call.index)
        .and_then(Instruction::callee);
    if callee != Some(func.name.as_str()) {
        return Err(RewriteError::NotASelfCall {
            block: call.block,
            index: call.index,
        });
    }
    if call.args.len() != slot_count {
        return Err(RewriteError::ArgumentCount {
            expected: slot_count,
            found: call.args.len(),
        });
    }
    Ok(())
}

/// Split the entry block right after its prologue. The tail becomes the
/// loop head; the entry block keeps the allocas and parameter stores.
pub fn split_entry(func: &mut Function, prologue: &PrologueMatch) -> ParamSlots {
    let loop_head = func.split_block(func.entry_block, prologue.split_at, LOOP_HEAD_LABEL);
    ParamSlots {
        loop_head,
        slots: prologue.slots.clone(),
    }
}

/// Loop head left behind by an earlier run: the entry block is nothing
/// but its prologue and falls through to a block labelled `tailrecurse`.
pub fn existing_loop_head(func: &Function, prologue: &PrologueMatch) -> Option<BlockId> {
    let entry = func.entry();
    match entry.terminator {
        Terminator::Br { target }
            if prologue.split_at == entry.instructions.len()
                && target != func.entry_block
                && func.block(target).label == LOOP_HEAD_LABEL =>
        {
            Some(target)
        }
        _ => None,
    }
}

/// Add the accumulator slot to the entry block, seeded with the
/// operation's identity. Returns the slot.
pub fn materialize_accumulator(func: &mut Function, acc: &Accumulator) -> ValueId {
    let slot = func.next_value();
    let seed = func.next_value();
    let entry = func.entry_block;
    func.block_mut(entry).instructions.extend([
        Instruction::Alloca {
            dest: slot,
            ty: acc.ty,
            count: AllocaCount::Static(1),
        },
        Instruction::Const {
            dest: seed,
            value: acc.identity,
            ty: acc.ty,
        },
        Instruction::Store {
            address: slot,
            value: seed,
            ty: acc.ty,
            volatile: false,
        },
    ]);
    slot
}

/// Replace `call` and everything after it in its block with stores of
/// the arguments into the parameter slots and a branch to the loop head.
/// With an accumulator, the accumulating operation is folded into its
/// slot first.
pub fn rebind_call(
    func: &mut Function,
    call: &CallSite,
    params: &ParamSlots,
    accumulator: Option<&(Accumulator, ValueId)>,
) {
    let mut tail = Vec::with_capacity(call.args.len() + 3);

    if let Some((acc, slot)) = accumulator {
        let current = func.next_value();
        let folded = func.next_value();
        let (lhs, rhs) = if acc.call_on_lhs {
            (current, acc.operand)
        } else {
            (acc.operand, current)
        };
        tail.push(Instruction::Load {
            dest: current,
            ty: acc.ty,
            address: *slot,
            volatile: false,
        });
        tail.push(Instruction::BinaryOp {
            dest: folded,
            op: acc.op,
            ty: acc.ty,
            lhs,
            rhs,
        });
        tail.push(Instruction::Store {
            address: *slot,
            value: folded,
            ty: acc.ty,
            volatile: false,
        });
    }

    for ((arg, slot), ty) in call.args.iter().zip(&params.slots).zip(&func.params) {
        tail.push(Instruction::Store {
            address: *slot,
            value: *arg,
            ty: *ty,
            volatile: false,
        });
    }

    let block = func.block_mut(call.block);
    block.instructions.truncate(call.index);
    block.instructions.extend(tail);
    block.terminator = Terminator::Br {
        target: params.loop_head,
    };
}

/// Fold the accumulator into the value of every return. Returns the
/// number of returns rewritten.
pub fn fold_returns(func: &mut Function, acc: &Accumulator, slot: ValueId) -> usize {
    let mut folded_count = 0;
    for index in 0..func.blocks.len() {
        let Terminator::Ret { value: Some(value) } = func.blocks[index].terminator else {
            continue;
        };
        let current = func.next_value();
        let folded = func.next_value();
        let block = &mut func.blocks[index];
        block.instructions.push(Instruction::Load {
            dest: current,
            ty: acc.ty,
            address: slot,
            volatile: false,
        });
        block.instructions.push(Instruction::BinaryOp {
            dest: folded,
            op: acc.op,
            ty: acc.ty,
            lhs: current,
            rhs: value,
        });
        block.terminator = Terminator::Ret {
            value: Some(folded),
        };
        folded_count += 1;
    }
    folded_count
}
