// ===================================================================
// FILE: lib.rs (tre-ir-builder crate)
//
// DESC: Programmatic IR Builder API. Constructs tre-ir functions
//       directly, including the parameter-spilling prologue that an
//       unoptimized front end emits at the top of every function.
// ===================================================================

use tre_ir::*;

/// Stack slots created by [`FunctionBuilder::prologue`]
#[derive(Debug, Clone, PartialEq)]
pub struct Prologue {
    /// One slot per parameter, in declaration order
    pub params: Vec<ValueId>,
    /// Extra local slots, in the order requested
    pub locals: Vec<ValueId>,
}

/// Builder for constructing IR programmatically.
pub struct FunctionBuilder<'a> {
    /// The function IR we are building
    func: &'a mut Function,

    /// The current block we are inserting instructions into
    current_block: Option<usize>,
}

impl<'a> FunctionBuilder<'a> {
    /// Create a new FunctionBuilder for the given function
    pub fn new(func: &'a mut Function) -> Self {
        Self {
            func,
            current_block: None,
        }
    }

    /// Switch to inserting instructions into the given block
    pub fn switch_to_block(&mut self, block: BlockId) {
        let block_index = block.index();
        assert!(block_index < self.func.blocks.len(), "Block does not exist");
        self.current_block = Some(block_index);
    }

    /// Get the current block being built
    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block.map(BlockId::new)
    }

    /// Create a new basic block and add it to the function
    pub fn create_block(&mut self, label: &str) -> BlockId {
        self.func.add_block(label)
    }

    /// Mark the function as taking a variable number of arguments
    pub fn set_variadic(&mut self, variadic: bool) {
        self.func.is_variadic = variadic;
    }

    /// The SSA value of parameter `index`
    pub fn param(&self, index: usize) -> ValueId {
        self.func.param_value(index)
    }

    /// Emit the unoptimized-lowering prologue into the current block:
    /// one alloca per local, one alloca per parameter, then one store of
    /// each parameter into its slot.
    pub fn prologue(&mut self, locals: &[Type]) -> Prologue {
        let locals: Vec<ValueId> = locals.iter().map(|ty| self.ins().alloca(*ty)).collect();
        let param_types = self.func.params.clone();
        let params: Vec<ValueId> = param_types.iter().map(|ty| self.ins().alloca(*ty)).collect();
        for (index, (slot, ty)) in params.iter().zip(param_types).enumerate() {
            let value = self.param(index);
            self.ins().store(*slot, value, ty);
        }
        Prologue { params, locals }
    }

    /// Get an instruction builder for fluent API
    pub fn ins(&mut self) -> InstructionBuilder<'_, 'a> {
        InstructionBuilder { builder: self }
    }

    /// Add an instruction to the current block
    fn add_instruction(&mut self, instr: Instruction) {
        let current_block = self
            .current_block
            .expect("No current block - call switch_to_block first");

        if let Some(block) = self.func.blocks.get_mut(current_block) {
            block.instructions.push(instr);
        }
    }

    /// Set the terminator for the current block
    pub fn set_terminator(&mut self, terminator: Terminator) {
        let current_block = self
            .current_block
            .expect("No current block - call switch_to_block first");

        if let Some(block) = self.func.blocks.get_mut(current_block) {
            block.terminator = terminator;
        }
    }
}

/// Fluent API for building instructions
pub struct InstructionBuilder<'a, 'b> {
    builder: &'a mut FunctionBuilder<'b>,
}

impl<'a, 'b> InstructionBuilder<'a, 'b> {
    fn fresh(&mut self) -> ValueId {
        self.builder.func.next_value()
    }

    /// Build a function call instruction
    pub fn call(&mut self, func_name: &str, args: Vec<ValueId>, return_type: Type) -> ValueId {
        let dest = self.fresh();
        self.builder.add_instruction(Instruction::Call {
            dest,
            function: func_name.to_string(),
            args,
            return_type,
        });
        dest
    }

    /// Build a void function call instruction
    pub fn call_void(&mut self, func_name: &str, args: Vec<ValueId>) {
        self.builder.add_instruction(Instruction::CallVoid {
            function: func_name.to_string(),
            args,
        });
    }

    /// Build a constant instruction
    pub fn iconst(&mut self, ty: Type, value: i64) -> ValueId {
        let dest = self.fresh();
        self.builder
            .add_instruction(Instruction::Const { dest, value, ty });
        dest
    }

    pub fn const_i32(&mut self, value: i32) -> ValueId {
        self.iconst(Type::I32, value as i64)
    }

    pub fn const_i64(&mut self, value: i64) -> ValueId {
        self.iconst(Type::I64, value)
    }

    /// Build a binary operation instruction
    pub fn binary_op(
        &mut self,
        op: BinaryOperator,
        ty: Type,
        lhs: ValueId,
        rhs: ValueId,
    ) -> ValueId {
        let dest = self.fresh();
        self.builder.add_instruction(Instruction::BinaryOp {
            dest,
            op,
            ty,
            lhs,
            rhs,
        });
        dest
    }

    pub fn add(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Add, ty, lhs, rhs)
    }

    pub fn sub(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Sub, ty, lhs, rhs)
    }

    pub fn mul(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Mul, ty, lhs, rhs)
    }

    pub fn rem(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Rem, ty, lhs, rhs)
    }

    pub fn cmp_eq(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Eq, ty, lhs, rhs)
    }

    pub fn cmp_ne(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Ne, ty, lhs, rhs)
    }

    pub fn cmp_lt(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Lt, ty, lhs, rhs)
    }

    pub fn cmp_le(&mut self, ty: Type, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_op(BinaryOperator::Le, ty, lhs, rhs)
    }

    /// Build a unary operation instruction
    pub fn unary_op(&mut self, op: UnaryOperator, ty: Type, operand: ValueId) -> ValueId {
        let dest = self.fresh();
        self.builder.add_instruction(Instruction::UnaryOp {
            dest,
            op,
            ty,
            operand,
        });
        dest
    }

    /// Build a single-element stack allocation
    pub fn alloca(&mut self, ty: Type) -> ValueId {
        self.alloca_n(ty, AllocaCount::Static(1))
    }

    /// Build a stack allocation with an explicit element count
    pub fn alloca_n(&mut self, ty: Type, count: AllocaCount) -> ValueId {
        let dest = self.fresh();
        self.builder
            .add_instruction(Instruction::Alloca { dest, ty, count });
        dest
    }

    /// Build a memory load instruction
    pub fn load(&mut self, ty: Type, address: ValueId) -> ValueId {
        self.load_with(ty, address, false)
    }

    pub fn load_volatile(&mut self, ty: Type, address: ValueId) -> ValueId {
        self.load_with(ty, address, true)
    }

    fn load_with(&mut self, ty: Type, address: ValueId, volatile: bool) -> ValueId {
        let dest = self.fresh();
        self.builder.add_instruction(Instruction::Load {
            dest,
            ty,
            address,
            volatile,
        });
        dest
    }

    /// Build a memory store instruction
    pub fn store(&mut self, address: ValueId, value: ValueId, ty: Type) {
        self.store_with(address, value, ty, false);
    }

    pub fn store_volatile(&mut self, address: ValueId, value: ValueId, ty: Type) {
        self.store_with(address, value, ty, true);
    }

    fn store_with(&mut self, address: ValueId, value: ValueId, ty: Type, volatile: bool) {
        self.builder.add_instruction(Instruction::Store {
            address,
            value,
            ty,
            volatile,
        });
    }

    /// Build a pointer addition instruction
    pub fn ptr_add(&mut self, ptr: ValueId, offset: ValueId) -> ValueId {
        let dest = self.fresh();
        self.builder
            .add_instruction(Instruction::PtrAdd { dest, ptr, offset });
        dest
    }

    /// Build a return instruction
    pub fn ret(&mut self, value: Option<ValueId>) {
        self.builder.set_terminator(Terminator::Ret { value });
    }

    /// Build a conditional branch instruction
    pub fn br_if(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId) {
        self.builder.set_terminator(Terminator::BrIf {
            cond: condition,
            true_target: then_block,
            false_target: else_block,
        });
    }

    /// Build an unconditional jump instruction
    pub fn jump(&mut self, target: BlockId) {
        self.builder.set_terminator(Terminator::Br { target });
    }
}

/// Builder for constructing entire programs
pub struct ProgramBuilder {
    /// The program being built
    program: Program,
}

impl ProgramBuilder {
    /// Create a new program builder
    pub fn new() -> Self {
        Self {
            program: Program::new(),
        }
    }

    /// Add an import to the program
    pub fn add_import(&mut self, module: &str, name: &str, params: Vec<Type>, return_type: Type) {
        self.program.imports.push(ImportDecl {
            module: module.to_string(),
            name: name.to_string(),
            params,
            return_type,
        });
    }

    /// Create a new function and return its index
    pub fn create_function(&mut self, name: &str, params: Vec<Type>, return_type: Type) -> usize {
        let func = Function::new(name.to_string(), params, return_type);
        self.program.functions.push(func);
        self.program.functions.len() - 1 // Return index for later use
    }

    /// Get a builder for an existing function
    pub fn function_builder(&mut self, function_index: usize) -> FunctionBuilder<'_> {
        let func = &mut self.program.functions[function_index];
        FunctionBuilder::new(func)
    }

    /// Finalize and return the built program
    pub fn build(self) -> Program {
        self.program
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_registration() {
        let mut builder = ProgramBuilder::new();
        builder.add_import("env", "print_i32", vec![Type::I32], Type::Void);

        assert_eq!(builder.program.imports.len(), 1);
        assert_eq!(builder.program.imports[0].name, "print_i32");
    }

    #[test]
    fn test_value_id_generation_skips_params() {
        let mut func = Function::new("test".to_string(), vec![Type::I32], Type::Void);
        let mut builder = FunctionBuilder::new(&mut func);

        let block = builder.create_block("entry");
        builder.switch_to_block(block);

        let val1 = builder.ins().const_i32(42);
        let val2 = builder.ins().const_i32(43);

        assert_eq!(val1, ValueId(1));
        assert_ne!(val1, val2);
    }

    #[test]
    fn test_prologue_shape() {
        let mut func = Function::new(
            "gcd".to_string(),
            vec![Type::I32, Type::I32],
            Type::I32,
        );
        let mut builder = FunctionBuilder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.switch_to_block(entry);

        let prologue = builder.prologue(&[Type::I32]);
        let zero = builder.ins().const_i32(0);
        builder.ins().ret(Some(zero));

        assert_eq!(prologue.locals.len(), 1);
        assert_eq!(prologue.params.len(), 2);

        let instrs = &func.blocks[0].instructions;
        assert_eq!(instrs.len(), 6);
        assert!(matches!(instrs[0], Instruction::Alloca { .. }));
        assert!(matches!(instrs[2], Instruction::Alloca { .. }));
        assert_eq!(
            instrs[3],
            Instruction::Store {
                address: prologue.params[0],
                value: ValueId(0),
                ty: Type::I32,
                volatile: false,
            }
        );
        assert_eq!(
            instrs[4],
            Instruction::Store {
                address: prologue.params[1],
                value: ValueId(1),
                ty: Type::I32,
                volatile: false,
            }
        );
        assert!(verify_function(&func).is_ok());
    }

    #[test]
    fn test_conditional_logic() {
        let mut func = Function::new("max".to_string(), vec![Type::I32, Type::I32], Type::I32);
        let mut builder = FunctionBuilder::new(&mut func);

        let entry = builder.create_block("entry");
        let then_block = builder.create_block("then");
        let else_block = builder.create_block("else");

        builder.switch_to_block(entry);
        let a = builder.param(0);
        let b = builder.param(1);
        let cmp = builder.ins().cmp_lt(Type::I32, a, b);
        builder.ins().br_if(cmp, then_block, else_block);

        builder.switch_to_block(then_block);
        builder.ins().ret(Some(b));

        builder.switch_to_block(else_block);
        builder.ins().ret(Some(a));

        assert_eq!(func.blocks.len(), 3);
        assert_eq!(func.return_blocks(), vec![BlockId(1), BlockId(2)]);
        assert!(verify_function(&func).is_ok());
    }

    #[test]
    fn test_volatile_flags() {
        let mut func = Function::new("v".to_string(), vec![], Type::Void);
        let mut builder = FunctionBuilder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.switch_to_block(entry);
        let slot = builder.ins().alloca(Type::I32);
        let one = builder.ins().const_i32(1);
        builder.ins().store_volatile(slot, one, Type::I32);
        builder.ins().load_volatile(Type::I32, slot);
        builder.ins().ret(None);

        let instrs = &func.blocks[0].instructions;
        assert!(instrs[2].is_volatile());
        assert!(instrs[3].is_volatile());
        assert!(!instrs[1].is_volatile());
    }
}
