// ===================================================================
// FILE: accumulate.rs (tre-opt crate)
//
// DESC: Recognises `x op f(..)` where `op` is associative and
//       commutative, so the call can become a tail call that threads
//       `x` through an accumulator slot.
// ===================================================================

use tre_ir::{BinaryOperator, Instruction, Type, ValueId};

use crate::locate::CallSite;

/// A binary operation that folds the result of a self-call into a value
/// computed before it, e.g. `n * fact(n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulator {
    /// Value defined by the operation
    pub result: ValueId,
    pub op: BinaryOperator,
    pub ty: Type,
    /// The operand that is not the call result
    pub operand: ValueId,
    /// Whether the call result is the left-hand operand
    pub call_on_lhs: bool,
    /// Seed of the accumulator slot, `op`'s identity element
    pub identity: i64,
}

impl Accumulator {
    /// Recognize `instr` as an accumulation of `call_result`
    pub fn from_instruction(instr: &Instruction, call_result: ValueId) -> Option<Self> {
        let Instruction::BinaryOp {
            dest,
            op,
            ty,
            lhs,
            rhs,
        } = instr
        else {
            return None;
        };
        if !op.is_associative() || !op.is_commutative() {
            return None;
        }
        let identity = op.identity(*ty)?;
        let (operand, call_on_lhs) = match (*lhs == call_result, *rhs == call_result) {
            (true, false) => (*rhs, true),
            (false, true) => (*lhs, false),
            _ => return None,
        };
        Some(Accumulator {
            result: *dest,
            op: *op,
            ty: *ty,
            operand,
            call_on_lhs,
            identity,
        })
    }
}

/// True if `instr` can be hoisted into an accumulator for `call`
pub fn can_accumulate(instr: &Instruction, call: &CallSite) -> bool {
    call.result
        .is_some_and(|result| Accumulator::from_instruction(instr, result).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use tre_ir::BlockId;

    const CALL: ValueId = ValueId(7);
    const OTHER: ValueId = ValueId(3);

    fn call_site(result: Option<ValueId>) -> CallSite {
        CallSite {
            block: BlockId(1),
            index: 4,
            result,
            args: vec![],
        }
    }

    fn binop(op: BinaryOperator, ty: Type, lhs: ValueId, rhs: ValueId) -> Instruction {
        Instruction::BinaryOp {
            dest: ValueId(8),
            op,
            ty,
            lhs,
            rhs,
        }
    }

    #[test_case(BinaryOperator::Add, 0 ; "add")]
    #[test_case(BinaryOperator::Mul, 1 ; "mul")]
    #[test_case(BinaryOperator::And, -1 ; "and")]
    #[test_case(BinaryOperator::Or, 0 ; "or")]
    #[test_case(BinaryOperator::Xor, 0 ; "xor")]
    fn test_accumulable_operators(op: BinaryOperator, identity: i64) {
        let instr = binop(op, Type::I32, OTHER, CALL);
        let acc = Accumulator::from_instruction(&instr, CALL).unwrap();
        assert_eq!(acc.identity, identity);
        assert_eq!(acc.operand, OTHER);
        assert!(!acc.call_on_lhs);
        assert!(can_accumulate(&instr, &call_site(Some(CALL))));
    }

    #[test_case(BinaryOperator::Sub ; "sub")]
    #[test_case(BinaryOperator::Div ; "div")]
    #[test_case(BinaryOperator::Shl ; "shl")]
    #[test_case(BinaryOperator::Eq ; "eq is commutative but not associative")]
    #[test_case(BinaryOperator::Lt ; "lt")]
    fn test_rejected_operators(op: BinaryOperator) {
        let instr = binop(op, Type::I32, OTHER, CALL);
        assert!(!can_accumulate(&instr, &call_site(Some(CALL))));
    }

    #[test]
    fn test_call_on_left() {
        let instr = binop(BinaryOperator::Mul, Type::I64, CALL, OTHER);
        let acc = Accumulator::from_instruction(&instr, CALL).unwrap();
        assert!(acc.call_on_lhs);
        assert_eq!(acc.ty, Type::I64);
    }

    #[test]
    fn test_floats_are_refused() {
        let instr = binop(BinaryOperator::Mul, Type::F64, OTHER, CALL);
        assert!(!can_accumulate(&instr, &call_site(Some(CALL))));
    }

    #[test]
    fn test_exactly_one_operand_must_be_the_call() {
        let both = binop(BinaryOperator::Add, Type::I32, CALL, CALL);
        let neither = binop(BinaryOperator::Add, Type::I32, OTHER, OTHER);
        assert!(!can_accumulate(&both, &call_site(Some(CALL))));
        assert!(!can_accumulate(&neither, &call_site(Some(CALL))));
    }

    #[test]
    fn test_void_call_never_accumulates() {
        let instr = binop(BinaryOperator::Add, Type::I32, OTHER, CALL);
        assert!(!can_accumulate(&instr, &call_site(None)));
    }

    #[test]
    fn test_non_binary_instruction() {
        let instr = Instruction::Const {
            dest: ValueId(8),
            value: 0,
            ty: Type::I32,
        };
        assert!(!can_accumulate(&instr, &call_site(Some(CALL))));
    }
}
