// ===================================================================
// FILE: validate.rs (tre-opt crate)
//
// DESC: Proves that a self-call is in tail position by walking forward
//       from the call to the return it feeds. The walk may pass through
//       one staging store/load pair of the returned value, at most one
//       accumulating binary operation, and unconditional jumps.
// ===================================================================

use std::collections::HashSet;

use tre_ir::{Function, Instruction, Terminator, Type, ValueId};

use crate::accumulate::Accumulator;
use crate::error::NotTailReason;
use crate::locate::CallSite;

/// Outcome of [`classify_tail_position`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Tail,
    TailWithAccumulator(Accumulator),
    NotTail(NotTailReason),
}

impl Verdict {
    pub fn is_tail(&self) -> bool {
        !matches!(self, Verdict::NotTail(_))
    }

    pub fn accumulator(&self) -> Option<&Accumulator> {
        match self {
            Verdict::TailWithAccumulator(acc) => Some(acc),
            _ => None,
        }
    }
}

/// Decide whether `call` is a tail call. With `allow_accumulation`, a
/// call followed by an associative, commutative operation in its own
/// block is accepted as [`Verdict::TailWithAccumulator`].
pub fn classify_tail_position(func: &Function, call: &CallSite, allow_accumulation: bool) -> Verdict {
    let walk = TailWalk::new(func, call, allow_accumulation);
    match walk.run() {
        Ok(Some(acc)) => Verdict::TailWithAccumulator(acc),
        Ok(None) => Verdict::Tail,
        Err(reason) => Verdict::NotTail(reason),
    }
}

struct TailWalk<'a> {
    func: &'a Function,
    call: &'a CallSite,
    allow_accumulation: bool,
    accumulator: Option<Accumulator>,
    /// Slot the returned value is staged through
    return_slot: Option<ValueId>,
    /// Whether the staged value is the accumulator's result
    slot_holds_accumulator: bool,
    return_load: Option<ValueId>,
    /// Values the rewrite deletes: the call and everything after it in its block
    doomed: HashSet<ValueId>,
}

impl<'a> TailWalk<'a> {
    fn new(func: &'a Function, call: &'a CallSite, allow_accumulation: bool) -> Self {
        Self {
            func,
            call,
            allow_accumulation,
            accumulator: None,
            return_slot: None,
            slot_holds_accumulator: false,
            return_load: None,
            doomed: call.result.into_iter().collect(),
        }
    }

    fn run(mut self) -> Result<Option<Accumulator>, NotTailReason> {
        let mut block = self.call.block;
        let mut index = self.call.index + 1;
        let mut visited = HashSet::from([block]);

        loop {
            let in_call_block = block == self.call.block;
            let bb = self.func.block(block);

            if let Some(instr) = bb.instructions.get(index) {
                if !in_call_block {
                    self.reject_doomed(instr.operands())?;
                }
                self.step(instr, in_call_block)?;
                if in_call_block {
                    self.doomed.extend(instr.dest());
                }
                index += 1;
                continue;
            }

            match &bb.terminator {
                Terminator::Ret { value } => {
                    if !in_call_block {
                        self.reject_doomed(bb.terminator.operands())?;
                    }
                    self.check_return(*value)?;
                    return Ok(self.accumulator);
                }
                Terminator::Br { target } => {
                    if !visited.insert(*target) {
                        return Err(NotTailReason::Cycle(*target));
                    }
                    tracing::trace!(
                        function = %self.func.name,
                        target = %self.func.block(*target).label,
                        "following jump after the call"
                    );
                    block = *target;
                    index = 0;
                }
                Terminator::BrIf { .. } => return Err(NotTailReason::ConditionalBranch),
            }
        }
    }

    fn reject_doomed(&self, operands: Vec<ValueId>) -> Result<(), NotTailReason> {
        match operands.into_iter().find(|v| self.doomed.contains(v)) {
            Some(value) => Err(NotTailReason::EscapingValue(value)),
            None => Ok(()),
        }
    }

    fn step(&mut self, instr: &Instruction, in_call_block: bool) -> Result<(), NotTailReason> {
        if instr.is_volatile() {
            return Err(NotTailReason::Volatile);
        }

        match instr {
            Instruction::Store { address, value, .. } => {
                let staged = match &self.accumulator {
                    Some(acc) => Some(acc.result),
                    None => self.call.result,
                };
                if self.return_slot.is_some() || staged != Some(*value) {
                    return Err(NotTailReason::UnexpectedStore);
                }
                self.return_slot = Some(*address);
                self.slot_holds_accumulator = self.accumulator.is_some();
                Ok(())
            }
            Instruction::Load { dest, address, .. } => {
                if self.return_load.is_some() || self.return_slot != Some(*address) {
                    return Err(NotTailReason::UnexpectedLoad);
                }
                self.return_load = Some(*dest);
                Ok(())
            }
            other => {
                if let Some(acc) = self.try_adopt(other, in_call_block) {
                    tracing::debug!(
                        function = %self.func.name,
                        op = %acc.op,
                        "instruction can be accumulated"
                    );
                    self.accumulator = Some(acc);
                    return Ok(());
                }
                Err(NotTailReason::UnexpectedInstruction(other.to_string()))
            }
        }
    }

    fn try_adopt(&self, instr: &Instruction, in_call_block: bool) -> Option<Accumulator> {
        if !self.allow_accumulation || self.accumulator.is_some() || !in_call_block {
            return None;
        }
        let acc = Accumulator::from_instruction(instr, self.call.result?)?;
        // The folded operand must survive the deletion of the call's tail
        (!self.doomed.contains(&acc.operand)).then_some(acc)
    }

    fn check_return(&self, value: Option<ValueId>) -> Result<(), NotTailReason> {
        if self.func.return_type == Type::Void {
            return Ok(());
        }
        let Some(value) = value else {
            return Err(NotTailReason::UnrelatedReturn);
        };
        let from_load = self.return_load == Some(value);

        match &self.accumulator {
            Some(acc) => {
                if value == acc.result || (from_load && self.slot_holds_accumulator) {
                    Ok(())
                } else {
                    Err(NotTailReason::AccumulatorDropped)
                }
            }
            None => {
                if Some(value) == self.call.result || from_load {
                    Ok(())
                } else {
                    Err(NotTailReason::UnrelatedReturn)
                }
            }
        }
    }
}
