// ===================================================================
// FILE: locate.rs (tre-opt crate)
//
// DESC: Finds the last call a block makes to its own function.
// ===================================================================

use tre_ir::{BlockId, Function, Instruction, ValueId};

/// A call from a function to itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub block: BlockId,
    /// Position of the call in the block's instruction list
    pub index: usize,
    /// The call's result; `None` for a void call
    pub result: Option<ValueId>,
    pub args: Vec<ValueId>,
}

impl CallSite {
    /// Where this call ends up after its block was split at `at`, with
    /// everything from `at` onward moved into `tail`.
    pub fn relocated(&self, split: BlockId, at: usize, tail: BlockId) -> CallSite {
        if self.block == split && self.index >= at {
            CallSite {
                block: tail,
                index: self.index - at,
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }
}

/// The self-call closest to the end of `block`, if any
pub fn find_last_self_call(func: &Function, block: BlockId) -> Option<CallSite> {
    func.block(block)
        .instructions
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, instr)| match instr {
            Instruction::Call { dest, function, args, .. } if *function == func.name => {
                Some(CallSite {
                    block,
                    index,
                    result: Some(*dest),
                    args: args.clone(),
                })
            }
            Instruction::CallVoid { function, args } if *function == func.name => Some(CallSite {
                block,
                index,
                result: None,
                args: args.clone(),
            }),
            _ => None,
        })
}
