// ===================================================================
// FILE: shape.rs (tre-opt crate)
//
// DESC: Cheap per-block filter: only blocks that return, or jump
//       straight to a returning block, can end in a tail call.
// ===================================================================

use tre_ir::{BlockId, Function, Terminator};

use crate::options::PassOptions;

/// A block can end in a tail call only if it returns, or, with
/// `cross_jumps`, jumps straight to a block that returns.
pub fn is_block_rewrite_candidate(func: &Function, block: BlockId, options: &PassOptions) -> bool {
    match &func.block(block).terminator {
        Terminator::Ret { .. } => true,
        Terminator::Br { target } => {
            options.cross_jumps && func.block(*target).terminator.is_return()
        }
        Terminator::BrIf { .. } => false,
    }
}
