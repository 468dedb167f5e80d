// ===================================================================
// FILE: display.rs (tre-ir crate)
//
// DESC: Human-readable dump of the IR in a textual assembly syntax. Used for
//       diagnostics and by the driver binary; there is no parser for it.
// ===================================================================

use std::fmt;

use crate::*;

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

fn join(values: &[ValueId]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn volatile_marker(volatile: bool) -> &'static str {
    if volatile { " volatile" } else { "" }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty, count } => match count {
                AllocaCount::Static(1) => write!(f, "{dest}:ptr = alloca {ty}"),
                AllocaCount::Static(n) => write!(f, "{dest}:ptr = alloca {ty}, {n}"),
                AllocaCount::Dynamic(n) => write!(f, "{dest}:ptr = alloca {ty}, {n}"),
            },
            Instruction::Load {
                dest,
                ty,
                address,
                volatile,
            } => write!(
                f,
                "{dest}:{ty} = {ty}.load{} {address}",
                volatile_marker(*volatile)
            ),
            Instruction::Store {
                address,
                value,
                ty,
                volatile,
            } => write!(
                f,
                "{ty}.store{} {address}, {value}",
                volatile_marker(*volatile)
            ),
            Instruction::Call {
                dest,
                function,
                args,
                return_type,
            } => write!(f, "{dest}:{return_type} = call {function}({})", join(args)),
            Instruction::CallVoid { function, args } => {
                write!(f, "call {function}({})", join(args))
            }
            Instruction::BinaryOp {
                dest,
                op,
                ty,
                lhs,
                rhs,
            } => {
                let result_ty = if op.is_comparison() { Type::I32 } else { *ty };
                write!(f, "{dest}:{result_ty} = {ty}.{op} {lhs}, {rhs}")
            }
            Instruction::UnaryOp {
                dest,
                op,
                ty,
                operand,
            } => write!(f, "{dest}:{ty} = {ty}.{} {operand}", op.mnemonic()),
            Instruction::Const { dest, value, ty } => write!(f, "{dest}:{ty} = {ty}.const {value}"),
            Instruction::PtrAdd { dest, ptr, offset } => {
                write!(f, "{dest}:ptr = ptr.add {ptr}, {offset}")
            }
        }
    }
}

impl Function {
    fn label_of(&self, id: BlockId) -> String {
        self.blocks
            .get(id.index())
            .map(|b| b.label.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn write_terminator(&self, term: &Terminator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match term {
            Terminator::Ret { value: Some(v) } => write!(f, "ret {v}"),
            Terminator::Ret { value: None } => write!(f, "ret"),
            Terminator::Br { target } => write!(f, "br {}", self.label_of(*target)),
            Terminator::BrIf {
                cond,
                true_target,
                false_target,
            } => write!(
                f,
                "br_if {cond}, {}, {}",
                self.label_of(*true_target),
                self.label_of(*false_target)
            ),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("v{i}:{ty}"))
            .collect::<Vec<_>>()
            .join(", ");
        let dots = if self.is_variadic { ", ..." } else { "" };
        writeln!(f, "fn {}({params}{dots}) -> {} {{", self.name, self.return_type)?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for instr in &block.instructions {
                writeln!(f, "    {instr}")?;
            }
            write!(f, "    ")?;
            self.write_terminator(&block.terminator, f)?;
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            let params = import
                .params
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                f,
                "import \"{}\" \"{}\" ({params}) -> {}",
                import.module, import.name, import.return_type
            )?;
        }
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 || !self.imports.is_empty() {
                writeln!(f)?;
            }
            writeln!(f, "{func}")?;
        }
        Ok(())
    }
}
