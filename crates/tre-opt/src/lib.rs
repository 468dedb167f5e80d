// ===================================================================
// FILE: lib.rs (tre-opt crate)
//
// DESC: Tail recursion elimination over tre-ir. A self-call in tail
//       position is replaced by stores into the parameter slots and a
//       branch back to the top of the function; a call wrapped in one
//       associative, commutative operation is first turned into a tail
//       call by threading an accumulator through the loop.
// ===================================================================

pub mod accumulate;
pub mod driver;
pub mod error;
pub mod locate;
pub mod options;
pub mod safety;
pub mod shape;
pub mod transform;
pub mod validate;

#[cfg(test)]
mod fixtures;

pub use accumulate::{Accumulator, can_accumulate};
pub use driver::{
    EliminationStats, TailCall, TailRecursionElimination, eliminate_tail_recursion, find_tail_call,
};
pub use error::{NotTailReason, PrologueMismatch, RewriteError, UnsafeFrame};
pub use locate::{CallSite, find_last_self_call};
pub use options::PassOptions;
pub use safety::{check_function, is_function_rewrite_safe};
pub use shape::is_block_rewrite_candidate;
pub use transform::{LOOP_HEAD_LABEL, ParamSlots};
pub use validate::{Verdict, classify_tail_position};
