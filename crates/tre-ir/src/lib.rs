// ===================================================================
// FILE: lib.rs (tre-ir crate)
//
// DESC: Defines the control-flow graph IR that the tail recursion
//       pass analyses and rewrites. Blocks live in an arena indexed by
//       BlockId and every result-producing instruction defines an SSA
//       value addressed by ValueId.
// ===================================================================

mod display;
pub mod verify;


pub use verify::{VerifyError, verify_function};

/// Value types understood by the IR
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Type {
    I32,
    I64,
    F32,
    F64,
    Ptr,
    Void,
}

impl Type {
    pub fn is_integer(self) -> bool {
        matches!(self, Type::I32 | Type::I64)
    }

    /// Storage size in bytes, used by stack allocation and pointer math
    pub fn size_in_bytes(self) -> u64 {
        match self {
            Type::I32 | Type::F32 => 4,
            Type::I64 | Type::F64 | Type::Ptr => 8,
            Type::Void => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Ptr => "ptr",
            Type::Void => "void",
        }
    }
}

/// Program-level IR containing all functions and imports
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub imports: Vec<ImportDecl>,
    pub functions: Vec<Function>,
}

/// A host function the program may call
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub module: String,
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

/// A function in IR form with resolved references
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_variadic: bool,
    pub blocks: Vec<BasicBlock>,
    pub entry_block: BlockId,
    pub next_value_id: ValueId, // For generating unique value IDs
}

/// Opaque identifier for a basic block. Equal to the block's index in
/// `Function::blocks`; blocks are never removed so ids stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// Opaque identifier for an SSA value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub usize);

/// A basic block in the IR. The terminator lives in its own field, so a
/// block always has exactly one and it is always last.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String, // Keep original label for debugging
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

/// Element count of a stack allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocaCount {
    /// Known when the function is compiled
    Static(u32),
    /// Computed at runtime from an SSA value
    Dynamic(ValueId),
}

/// Instructions in the IR with resolved references
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Reserve frame-local storage; `dest` holds its address
    Alloca {
        dest: ValueId,
        ty: Type,
        count: AllocaCount,
    },
    /// Load from memory
    Load {
        dest: ValueId,
        ty: Type,
        address: ValueId,
        volatile: bool,
    },
    /// Store to memory
    Store {
        address: ValueId,
        value: ValueId,
        ty: Type,
        volatile: bool,
    },
    /// Function call with assignment
    Call {
        dest: ValueId,
        function: String,
        args: Vec<ValueId>,
        return_type: Type,
    },
    /// Function call without assignment (void functions)
    CallVoid {
        function: String,
        args: Vec<ValueId>,
    },
    /// Binary arithmetic operation
    BinaryOp {
        dest: ValueId,
        op: BinaryOperator,
        ty: Type,
        lhs: ValueId,
        rhs: ValueId,
    },
    /// Unary operation
    UnaryOp {
        dest: ValueId,
        op: UnaryOperator,
        ty: Type,
        operand: ValueId,
    },
    /// Constant assignment
    Const {
        dest: ValueId,
        value: i64,
        ty: Type,
    },
    /// Pointer arithmetic - add a byte offset to a pointer
    PtrAdd {
        dest: ValueId,
        ptr: ValueId,
        offset: ValueId,
    },
}

/// Terminator instructions that end basic blocks
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    /// Return from function
    Ret { value: Option<ValueId> },
    /// Unconditional branch
    Br { target: BlockId },
    /// Conditional branch
    BrIf {
        cond: ValueId,
        true_target: BlockId,
        false_target: BlockId,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Neg,
    Not,
}

impl BlockId {
    pub fn new(id: usize) -> Self {
        BlockId(id)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl ValueId {
    pub fn new(id: usize) -> Self {
        ValueId(id)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }
}

impl Function {
    /// Create a new function with the given name and types.
    /// Parameters occupy the values `v0 .. v{n-1}`.
    pub fn new(name: String, params: Vec<Type>, return_type: Type) -> Self {
        let next_value_id = ValueId(params.len());
        Function {
            name,
            params,
            return_type,
            is_variadic: false,
            blocks: Vec::new(),
            entry_block: BlockId(0),
            next_value_id,
        }
    }

    /// Generate the next unique value ID
    pub fn next_value(&mut self) -> ValueId {
        let id = self.next_value_id;
        self.next_value_id = ValueId(id.0 + 1);
        id
    }

    /// The SSA value carrying the parameter at `index`
    pub fn param_value(&self, index: usize) -> ValueId {
        debug_assert!(index < self.params.len());
        ValueId(index)
    }

    pub fn is_param(&self, value: ValueId) -> bool {
        value.0 < self.params.len()
    }

    pub fn entry(&self) -> &BasicBlock {
        &self.blocks[self.entry_block.index()]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// Append a new, empty block (terminated by a placeholder `ret`)
    pub fn add_block(&mut self, label: &str) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, label.to_string()));
        id
    }

    /// Split `block` before instruction `at`. The tail of the block,
    /// terminator included, moves to a new block appended to the arena and
    /// the original block falls through to it with an unconditional branch.
    pub fn split_block(&mut self, block: BlockId, at: usize, label: &str) -> BlockId {
        let new_id = self.add_block(label);
        let head = &mut self.blocks[block.index()];
        let tail = head.instructions.split_off(at);
        let terminator = std::mem::replace(&mut head.terminator, Terminator::Br { target: new_id });

        let new_block = &mut self.blocks[new_id.index()];
        new_block.instructions = tail;
        new_block.terminator = terminator;
        new_id
    }

    /// Number of operand slots, across instructions and terminators, that read `value`
    pub fn use_count(&self, value: ValueId) -> usize {
        self.blocks
            .iter()
            .map(|block| {
                let in_body: usize = block
                    .instructions
                    .iter()
                    .map(|instr| instr.operands().iter().filter(|v| **v == value).count())
                    .sum();
                let in_term = block.terminator.operands().iter().filter(|v| **v == value).count();
                in_body + in_term
            })
            .sum()
    }

    /// Locate the instruction defining `value`, as (block, index)
    pub fn definition(&self, value: ValueId) -> Option<(BlockId, usize)> {
        self.blocks.iter().find_map(|block| {
            block
                .instructions
                .iter()
                .position(|instr| instr.dest() == Some(value))
                .map(|index| (block.id, index))
        })
    }

    /// Every call site targeting `callee`
    pub fn calls_to(&self, callee: &str) -> Vec<(BlockId, usize)> {
        let mut sites = Vec::new();
        for block in &self.blocks {
            for (index, instr) in block.instructions.iter().enumerate() {
                if instr.callee() == Some(callee) {
                    sites.push((block.id, index));
                }
            }
        }
        sites
    }

    /// Number of calls this function makes to itself
    pub fn self_call_count(&self) -> usize {
        self.calls_to(&self.name).len()
    }

    /// Blocks whose terminator is a return
    pub fn return_blocks(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.terminator.is_return())
            .map(|b| b.id)
            .collect()
    }
}

impl BasicBlock {
    /// Create a new basic block
    pub fn new(id: BlockId, label: String) -> Self {
        BasicBlock {
            id,
            label,
            instructions: Vec::new(),
            terminator: Terminator::Ret { value: None }, // Placeholder
        }
    }
}

impl Instruction {
    /// The value this instruction defines, if any
    pub fn dest(&self) -> Option<ValueId> {
        match self {
            Instruction::Alloca { dest, .. }
            | Instruction::Load { dest, .. }
            | Instruction::Call { dest, .. }
            | Instruction::BinaryOp { dest, .. }
            | Instruction::UnaryOp { dest, .. }
            | Instruction::Const { dest, .. }
            | Instruction::PtrAdd { dest, .. } => Some(*dest),
            Instruction::Store { .. } | Instruction::CallVoid { .. } => None,
        }
    }

    /// Operands in slot order. For a store the address comes first.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Instruction::Alloca { count, .. } => match count {
                AllocaCount::Static(_) => vec![],
                AllocaCount::Dynamic(n) => vec![*n],
            },
            Instruction::Load { address, .. } => vec![*address],
            Instruction::Store { address, value, .. } => vec![*address, *value],
            Instruction::Call { args, .. } | Instruction::CallVoid { args, .. } => args.clone(),
            Instruction::BinaryOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            Instruction::UnaryOp { operand, .. } => vec![*operand],
            Instruction::Const { .. } => vec![],
            Instruction::PtrAdd { ptr, offset, .. } => vec![*ptr, *offset],
        }
    }

    pub fn is_volatile(&self) -> bool {
        matches!(
            self,
            Instruction::Load { volatile: true, .. } | Instruction::Store { volatile: true, .. }
        )
    }

    /// Name of the called function for direct calls
    pub fn callee(&self) -> Option<&str> {
        match self {
            Instruction::Call { function, .. } | Instruction::CallVoid { function, .. } => {
                Some(function.as_str())
            }
            _ => None,
        }
    }
}

impl Terminator {
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Terminator::Ret { value } => value.iter().copied().collect(),
            Terminator::Br { .. } => vec![],
            Terminator::BrIf { cond, .. } => vec![*cond],
        }
    }

    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Ret { .. } => vec![],
            Terminator::Br { target } => vec![*target],
            Terminator::BrIf {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Terminator::Ret { .. })
    }
}

impl BinaryOperator {
    /// `(a op b) op c == a op (b op c)` for integer operands
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Mul
                | BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Xor
        )
    }

    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Mul
                | BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Xor
                | BinaryOperator::Eq
                | BinaryOperator::Ne
        )
    }

    /// Identity element `e` with `x op e == x`, for integer types
    pub fn identity(self, ty: Type) -> Option<i64> {
        if !ty.is_integer() {
            return None;
        }
        match self {
            BinaryOperator::Add | BinaryOperator::Or | BinaryOperator::Xor => Some(0),
            BinaryOperator::Mul => Some(1),
            BinaryOperator::And => Some(-1),
            _ => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Sub => "sub",
            BinaryOperator::Mul => "mul",
            BinaryOperator::Div => "div",
            BinaryOperator::Rem => "rem",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Xor => "xor",
            BinaryOperator::Shl => "shl",
            BinaryOperator::Shr => "shr",
            BinaryOperator::Eq => "eq",
            BinaryOperator::Ne => "ne",
            BinaryOperator::Lt => "lt",
            BinaryOperator::Le => "le",
            BinaryOperator::Gt => "gt",
            BinaryOperator::Ge => "ge",
        }
    }
}

impl UnaryOperator {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "neg",
            UnaryOperator::Not => "not",
        }
    }
}
