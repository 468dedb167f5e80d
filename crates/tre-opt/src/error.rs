// ===================================================================
// FILE: error.rs (tre-opt crate)
//
// DESC: Reasons the pass declines to rewrite, and the invariant
//       violations the rewrite planner can detect before mutating.
// ===================================================================

use thiserror::Error;
use tre_ir::{BlockId, ValueId};

/// Why a function's stack frame can't be reused across iterations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafeFrame {
    #[error("function takes a variable number of arguments")]
    Variadic,

    #[error("alloca {value} outside the entry block, in '{block}'")]
    AllocaOutsideEntry { value: ValueId, block: String },

    #[error("alloca {value} has a size computed at runtime")]
    DynamicAlloca { value: ValueId },

    #[error("stack slot {slot} escapes through `{user}`")]
    EscapingSlot { slot: ValueId, user: String },
}

/// Why a self-call is not in tail position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotTailReason {
    #[error("volatile memory access after the call")]
    Volatile,

    #[error("store after the call does not stage the returned value")]
    UnexpectedStore,

    #[error("load after the call does not read the staged return value")]
    UnexpectedLoad,

    #[error("`{0}` after the call can't be accumulated")]
    UnexpectedInstruction(String),

    #[error("returned value does not come from the call")]
    UnrelatedReturn,

    #[error("returned value drops the accumulator")]
    AccumulatorDropped,

    #[error("conditional branch after the call")]
    ConditionalBranch,

    #[error("path after the call revisits block {0}")]
    Cycle(BlockId),

    #[error("{0} is defined after the call but used in a later block")]
    EscapingValue(ValueId),
}

/// Why the entry block doesn't look like a parameter-spilling prologue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrologueMismatch {
    #[error("expected parameter {index} to be stored at entry position {position}")]
    MissingParamStore { index: usize, position: usize },

    #[error("parameter {index} is stored into {address}, which is not a leading alloca")]
    NotASlot { index: usize, address: ValueId },

    #[error("parameter {index} has {uses} uses, expected exactly one")]
    ParamReused { index: usize, uses: usize },

    #[error("alloca {value} follows the prologue")]
    LateAlloca { value: ValueId },
}

/// Invariant violations caught while planning a rewrite
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("instruction {block}:{index} is not a self-call")]
    NotASelfCall { block: BlockId, index: usize },

    #[error("call passes {found} arguments but there are {expected} parameter slots")]
    ArgumentCount { expected: usize, found: usize },
}
