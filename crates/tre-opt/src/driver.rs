// ===================================================================
// FILE: driver.rs (tre-opt crate)
//
// DESC: Entry points of the pass. Finds a tail call, splits the entry
//       block once, rewrites the first call (possibly with an
//       accumulator), then keeps eliminating plain tail calls until
//       none are left.
// ===================================================================

use tre_ir::{BinaryOperator, Function, Program, verify_function};

use crate::accumulate::Accumulator;
use crate::locate::{CallSite, find_last_self_call};
use crate::options::PassOptions;
use crate::safety::check_function;
use crate::shape::is_block_rewrite_candidate;
use crate::transform::{self, ParamSlots};
use crate::validate::{Verdict, classify_tail_position};

/// A self-call proven to be in tail position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCall {
    pub call: CallSite,
    pub accumulator: Option<Accumulator>,
}

/// What one run of the pass did to a function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EliminationStats {
    /// Number of self-calls replaced by a branch to the loop head
    pub eliminated: usize,
    /// Operation threaded through the accumulator, if one was introduced
    pub accumulator: Option<BinaryOperator>,
}

impl EliminationStats {
    pub fn changed(&self) -> bool {
        self.eliminated > 0
    }
}

/// Search `func` for a tail call, in block order
pub fn find_tail_call(func: &Function, options: &PassOptions, allow_accumulation: bool) -> Option<TailCall> {
    if let Err(reason) = check_function(func) {
        tracing::debug!(function = %func.name, %reason, "function can't be optimized");
        return None;
    }

    for block in &func.blocks {
        if !is_block_rewrite_candidate(func, block.id, options) {
            continue;
        }
        let Some(call) = find_last_self_call(func, block.id) else {
            continue;
        };
        tracing::trace!(function = %func.name, block = %block.label, "found a recursive call");

        match classify_tail_position(func, &call, allow_accumulation) {
            Verdict::Tail => {
                tracing::debug!(function = %func.name, block = %block.label, "found a tail call");
                return Some(TailCall {
                    call,
                    accumulator: None,
                });
            }
            Verdict::TailWithAccumulator(acc) => {
                tracing::debug!(
                    function = %func.name,
                    block = %block.label,
                    op = %acc.op,
                    "found a tail call behind an accumulator"
                );
                return Some(TailCall {
                    call,
                    accumulator: Some(acc),
                });
            }
            Verdict::NotTail(reason) => {
                tracing::debug!(function = %func.name, block = %block.label, %reason, "not a tail call");
            }
        }
    }

    tracing::debug!(function = %func.name, "no tail recursion");
    None
}

/// Tail recursion elimination
#[derive(Debug, Clone, Default)]
pub struct TailRecursionElimination {
    options: PassOptions,
}

impl TailRecursionElimination {
    pub fn new(options: PassOptions) -> Self {
        Self { options }
    }

    /// Run on one function. Returns true if it was changed.
    pub fn run_on_function(&self, func: &mut Function) -> bool {
        self.run_on_function_with_stats(func).changed()
    }

    pub fn run_on_function_with_stats(&self, func: &mut Function) -> EliminationStats {
        let mut stats = EliminationStats::default();
        tracing::debug!(function = %func.name, "looking for tail recursion");

        let prologue = match transform::match_prologue(func) {
            Ok(prologue) => prologue,
            Err(reason) => {
                tracing::debug!(function = %func.name, %reason, "entry block does not spill parameters");
                return stats;
            }
        };
        // An earlier run already split the entry block. Whatever self-calls
        // it left behind need an accumulator, so resume with plain ones only.
        let resumed = transform::existing_loop_head(func, &prologue);
        let allow_accumulation = self.options.accumulate && resumed.is_none();

        let Some(first) = find_tail_call(func, &self.options, allow_accumulation) else {
            return stats;
        };
        if let Err(err) = transform::check_call_site(func, &first.call, prologue.slots.len()) {
            tracing::error!(function = %func.name, %err, "refusing to rewrite");
            debug_assert!(false, "{}: {}", func.name, err);
            return stats;
        }

        let TailCall { call, accumulator } = first;
        let (params, call) = match resumed {
            Some(loop_head) => {
                tracing::debug!(function = %func.name, %loop_head, "reusing loop head");
                let params = ParamSlots {
                    loop_head,
                    slots: prologue.slots,
                };
                (params, call)
            }
            None => {
                let entry = func.entry_block;
                let params = transform::split_entry(func, &prologue);
                tracing::debug!(function = %func.name, loop_head = %params.loop_head, "split entry block");
                let call = call.relocated(entry, prologue.split_at, params.loop_head);
                (params, call)
            }
        };
        let accumulator = accumulator.map(|acc| {
            let slot = transform::materialize_accumulator(func, &acc);
            tracing::debug!(function = %func.name, %slot, seed = acc.identity, "added accumulator");
            (acc, slot)
        });
        transform::rebind_call(func, &call, &params, accumulator.as_ref());
        stats.eliminated += 1;

        while let Some(next) = find_tail_call(func, &self.options, false) {
            if let Err(err) = transform::check_call_site(func, &next.call, params.slots.len()) {
                tracing::error!(function = %func.name, %err, "refusing to rewrite");
                debug_assert!(false, "{}: {}", func.name, err);
                break;
            }
            transform::rebind_call(func, &next.call, &params, None);
            stats.eliminated += 1;
        }

        if let Some((acc, slot)) = &accumulator {
            let folded = transform::fold_returns(func, acc, *slot);
            tracing::debug!(function = %func.name, returns = folded, "folded accumulator into returns");
            stats.accumulator = Some(acc.op);
        }

        tracing::debug!(function = %func.name, eliminated = stats.eliminated, "tail recursion eliminated");
        debug_assert!(
            verify_function(func).is_ok(),
            "{} is malformed after the rewrite: {:?}",
            func.name,
            verify_function(func)
        );
        stats
    }

    /// Run on every function of `program`. Returns how many changed.
    pub fn run_on_program(&self, program: &mut Program) -> usize {
        program
            .functions
            .iter_mut()
            .map(|func| self.run_on_function(func))
            .filter(|changed| *changed)
            .count()
    }
}

/// Run the pass with default options
pub fn eliminate_tail_recursion(func: &mut Function) -> bool {
    TailRecursionElimination::default().run_on_function(func)
}
