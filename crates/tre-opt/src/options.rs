// ===================================================================
// FILE: options.rs (tre-opt crate)
//
// DESC: Switches for the optional parts of the pass.
// ===================================================================

/// Knobs for [`crate::TailRecursionElimination`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOptions {
    /// Turn `x op f(..)` into a tail call by threading an accumulator
    pub accumulate: bool,
    /// Follow one unconditional jump from the call's block to a return block
    pub cross_jumps: bool,
}

impl PassOptions {
    pub fn with_accumulation(mut self, enabled: bool) -> Self {
        self.accumulate = enabled;
        self
    }

    pub fn with_cross_jumps(mut self, enabled: bool) -> Self {
        self.cross_jumps = enabled;
        self
    }
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            accumulate: true,
            cross_jumps: true,
        }
    }
}
