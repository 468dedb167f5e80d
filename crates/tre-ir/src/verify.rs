// ===================================================================
// FILE: verify.rs (tre-ir crate)
//
// DESC: Structural verifier for functions. Checks the properties the
//       optimizer must preserve: block arena consistency, valid branch
//       targets and single definition of every used value. Dominance
//       is not checked.
// ===================================================================

use std::collections::HashSet;

use thiserror::Error;

use crate::*;

/// Structural defects found by [`verify_function`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("function '{function}' has no blocks")]
    NoBlocks { function: String },

    #[error("function '{function}' must enter at bb0, found {found}")]
    EntryNotFirst { function: String, found: BlockId },

    #[error("function '{function}': block at index {index} carries id {id}")]
    BlockIdMismatch {
        function: String,
        index: usize,
        id: BlockId,
    },

    #[error("function '{function}': block '{block}' branches to missing block {target}")]
    UndefinedBlock {
        function: String,
        block: String,
        target: BlockId,
    },

    #[error("function '{function}': value {value} is defined more than once")]
    DuplicateDefinition { function: String, value: ValueId },

    #[error("function '{function}': block '{block}' uses undefined value {value}")]
    UndefinedValue {
        function: String,
        block: String,
        value: ValueId,
    },

    #[error("function '{function}': value {value} is beyond the value counter")]
    ValueOutOfRange { function: String, value: ValueId },

    #[error("function '{function}': block '{block}' assigns the result of a void call")]
    VoidCallResult { function: String, block: String },
}

/// Verify the structural integrity of a function
pub fn verify_function(func: &Function) -> Result<(), VerifyError> {
    let function = func.name.clone();

    if func.blocks.is_empty() {
        return Err(VerifyError::NoBlocks { function });
    }
    if func.entry_block != BlockId(0) {
        return Err(VerifyError::EntryNotFirst {
            function,
            found: func.entry_block,
        });
    }

    // Collect definitions first; SSA allows uses textually before defs
    // in other blocks.
    let mut defined: HashSet<ValueId> = (0..func.params.len()).map(ValueId).collect();
    for (index, block) in func.blocks.iter().enumerate() {
        if block.id.index() != index {
            return Err(VerifyError::BlockIdMismatch {
                function,
                index,
                id: block.id,
            });
        }
        for instr in &block.instructions {
            if let Instruction::Call {
                return_type: Type::Void,
                ..
            } = instr
            {
                return Err(VerifyError::VoidCallResult {
                    function,
                    block: block.label.clone(),
                });
            }
            if let Some(dest) = instr.dest() {
                if dest >= func.next_value_id {
                    return Err(VerifyError::ValueOutOfRange {
                        function,
                        value: dest,
                    });
                }
                if !defined.insert(dest) {
                    return Err(VerifyError::DuplicateDefinition {
                        function,
                        value: dest,
                    });
                }
            }
        }
    }

    for block in &func.blocks {
        let uses = block
            .instructions
            .iter()
            .flat_map(|instr| instr.operands())
            .chain(block.terminator.operands());
        for value in uses {
            if !defined.contains(&value) {
                return Err(VerifyError::UndefinedValue {
                    function,
                    block: block.label.clone(),
                    value,
                });
            }
        }
        for target in block.terminator.successors() {
            if target.index() >= func.blocks.len() {
                return Err(VerifyError::UndefinedBlock {
                    function,
                    block: block.label.clone(),
                    target,
                });
            }
        }
    }

    Ok(())
}
