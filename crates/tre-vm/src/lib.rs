// ===================================================================
// FILE: lib.rs (tre-vm crate)
//
// DESC: Virtual Machine (interpreter) for tre-ir. Executes functions
//       directly, gives every frame its own stack memory for allocas,
//       and records the deepest call stack reached so the effect of
//       tail recursion elimination can be observed.
// ===================================================================

mod memory;

use thiserror::Error;
use tracing::trace;
use tre_host_abi::{HostABI, RuntimeValue};
use tre_ir::*;

pub use memory::Memory;

/// Error types that can occur during VM execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VMError {
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Value not found: {0}")]
    ValueNotFound(ValueId),

    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: Type,
        actual: Type,
        context: String,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Host call error: {0}")]
    HostCallError(String),

    #[error("Stack overflow at depth {0}")]
    StackOverflow(usize),

    #[error("Read of uninitialized memory at 0x{0:x}")]
    UninitializedMemory(u64),

    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),
}

/// Result type for VM operations
pub type VMResult<T> = Result<T, VMError>;

/// A stack frame for function calls
#[derive(Debug, Clone)]
struct StackFrame {
    /// Index of the function in the program
    function: usize,
    /// Values in the current frame (ValueId -> RuntimeValue), indexed by ValueId
    values: Vec<Option<RuntimeValue>>,
    /// Current block being executed
    current_block: BlockId,
    /// Instruction pointer within the current block
    instruction_pointer: usize,
    /// Stack memory mark to release on return
    stack_base: u64,
}

impl StackFrame {
    fn new(function: usize, value_count: usize, entry_block: BlockId, stack_base: u64) -> Self {
        Self {
            function,
            values: vec![None; value_count],
            current_block: entry_block,
            instruction_pointer: 0,
            stack_base,
        }
    }

    fn get_value(&self, value_id: ValueId) -> VMResult<&RuntimeValue> {
        self.values
            .get(value_id.index())
            .and_then(|v| v.as_ref())
            .ok_or(VMError::ValueNotFound(value_id))
    }

    fn set_value(&mut self, value_id: ValueId, value: RuntimeValue) {
        if value_id.index() >= self.values.len() {
            self.values.resize(value_id.index() + 1, None);
        }
        self.values[value_id.index()] = Some(value);
    }
}

/// What the terminator of the current block decided
enum Flow {
    Continue,
    Return(RuntimeValue),
}

/// The tre-ir Virtual Machine
pub struct VM<H: HostABI> {
    /// The program being executed
    program: Program,
    /// Call stack
    call_stack: Vec<StackFrame>,
    /// Host ABI implementation
    host_abi: H,
    /// Stack and static memory
    memory: Memory,
    /// Maximum call stack depth (to prevent runaway recursion)
    max_stack_depth: usize,
    /// Deepest call stack observed since the last reset
    peak_depth: usize,
}

impl<H: HostABI> VM<H> {
    /// Create a new VM with the given program and host ABI
    pub fn new(program: Program, host_abi: H) -> Self {
        Self {
            program,
            call_stack: Vec::new(),
            host_abi,
            memory: Memory::new(),
            max_stack_depth: 200,
            peak_depth: 0,
        }
    }

    /// Set the maximum call stack depth
    pub fn set_max_stack_depth(&mut self, depth: usize) {
        self.max_stack_depth = depth;
    }

    /// Deepest call stack reached since creation
    pub fn peak_depth(&self) -> usize {
        self.peak_depth
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn host(&self) -> &H {
        &self.host_abi
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host_abi
    }

    /// Execute a function by name with the given arguments
    pub fn call_function(&mut self, name: &str, args: Vec<RuntimeValue>) -> VMResult<RuntimeValue> {
        let index = self
            .program
            .functions
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| VMError::FunctionNotFound(name.to_string()))?;
        let function = &self.program.functions[index];

        // Check argument count
        if args.len() != function.params.len() {
            return Err(VMError::InvalidInstruction(format!(
                "Function {} expects {} arguments, got {}",
                name,
                function.params.len(),
                args.len()
            )));
        }

        // Check stack depth
        if self.call_stack.len() >= self.max_stack_depth {
            return Err(VMError::StackOverflow(self.call_stack.len()));
        }

        if function.blocks.is_empty() {
            return Err(VMError::InvalidInstruction(
                "Function has no blocks".to_string(),
            ));
        }

        let mut frame = StackFrame::new(
            index,
            function.next_value_id.index(),
            function.entry_block,
            self.memory.stack_mark(),
        );

        // Parameters are the first values in the function scope
        for (i, (arg_value, param_type)) in args.into_iter().zip(function.params.iter()).enumerate() {
            if arg_value.get_type() != *param_type {
                return Err(VMError::TypeMismatch {
                    expected: *param_type,
                    actual: arg_value.get_type(),
                    context: format!("function parameter {} in function '{}'", i, name),
                });
            }
            frame.set_value(ValueId(i), arg_value);
        }

        trace!(function = name, depth = self.call_stack.len() + 1, "enter");

        // Push the frame and execute
        self.call_stack.push(frame);
        self.peak_depth = self.peak_depth.max(self.call_stack.len());
        let result = self.execute_function();
        if let Some(frame) = self.call_stack.pop() {
            self.memory.release_stack(frame.stack_base);
        }

        result
    }

    fn frame(&self) -> &StackFrame {
        self.call_stack.last().expect("VM has no active frame")
    }

    fn frame_mut(&mut self) -> &mut StackFrame {
        self.call_stack.last_mut().expect("VM has no active frame")
    }

    /// Execute the function in the current stack frame
    fn execute_function(&mut self) -> VMResult<RuntimeValue> {
        loop {
            let (function_index, block_id, ip) = {
                let frame = self.frame();
                (frame.function, frame.current_block, frame.instruction_pointer)
            };

            let block = self.program.functions[function_index]
                .blocks
                .get(block_id.index())
                .ok_or(VMError::BlockNotFound(block_id))?;

            // At the end of the block, run the terminator
            if ip >= block.instructions.len() {
                let terminator = block.terminator.clone();
                match self.execute_terminator(&terminator)? {
                    Flow::Continue => continue,
                    Flow::Return(value) => return Ok(value),
                }
            }

            let instruction = block.instructions[ip].clone();
            self.execute_instruction(&instruction)?;

            self.frame_mut().instruction_pointer += 1;
        }
    }

    fn execute_terminator(&mut self, terminator: &Terminator) -> VMResult<Flow> {
        match terminator {
            Terminator::Ret { value } => {
                let result = match value {
                    Some(val_id) => self.frame().get_value(*val_id)?.clone(),
                    None => RuntimeValue::Void,
                };
                Ok(Flow::Return(result))
            }
            Terminator::Br { target } => {
                self.jump(*target);
                Ok(Flow::Continue)
            }
            Terminator::BrIf {
                cond,
                true_target,
                false_target,
            } => {
                let cond_value = self.frame().get_value(*cond)?;
                let is_true = match cond_value {
                    RuntimeValue::I32(val) => *val != 0,
                    RuntimeValue::I64(val) => *val != 0,
                    _ => {
                        return Err(VMError::TypeMismatch {
                            expected: Type::I32,
                            actual: cond_value.get_type(),
                            context: "conditional branch condition".to_string(),
                        });
                    }
                };
                self.jump(if is_true { *true_target } else { *false_target });
                Ok(Flow::Continue)
            }
        }
    }

    fn jump(&mut self, target: BlockId) {
        let frame = self.frame_mut();
        frame.current_block = target;
        frame.instruction_pointer = 0;
    }

    fn pointer(&self, value: ValueId, context: &str) -> VMResult<u64> {
        let val = self.frame().get_value(value)?;
        val.try_as_ptr().ok_or_else(|| VMError::TypeMismatch {
            expected: Type::Ptr,
            actual: val.get_type(),
            context: context.to_string(),
        })
    }

    fn collect_args(&self, args: &[ValueId]) -> VMResult<Vec<RuntimeValue>> {
        let frame = self.frame();
        args.iter()
            .map(|arg_id| frame.get_value(*arg_id).cloned())
            .collect()
    }

    /// Execute a single instruction
    fn execute_instruction(&mut self, instruction: &Instruction) -> VMResult<()> {
        match instruction {
            Instruction::Alloca { dest, ty, count } => {
                let elements = match count {
                    AllocaCount::Static(n) => *n as u64,
                    AllocaCount::Dynamic(value) => match self.frame().get_value(*value)? {
                        RuntimeValue::I32(n) if *n >= 0 => *n as u64,
                        RuntimeValue::I64(n) if *n >= 0 => *n as u64,
                        other => {
                            return Err(VMError::InvalidInstruction(format!(
                                "alloca count must be a non-negative integer, got {:?}",
                                other
                            )));
                        }
                    },
                };
                let address = self.memory.push_stack(ty.size_in_bytes() * elements);
                self.frame_mut().set_value(*dest, RuntimeValue::Ptr(address));
            }

            Instruction::Load {
                dest, ty, address, ..
            } => {
                let addr = self.pointer(*address, "load instruction address")?;
                let value = self.memory.read(addr)?;
                if value.get_type() != *ty {
                    return Err(VMError::TypeMismatch {
                        expected: *ty,
                        actual: value.get_type(),
                        context: format!("load from 0x{:x}", addr),
                    });
                }
                self.frame_mut().set_value(*dest, value);
            }

            Instruction::Store {
                address, value, ty, ..
            } => {
                let addr = self.pointer(*address, "store instruction address")?;
                let val = self.frame().get_value(*value)?.clone();
                if val.get_type() != *ty {
                    return Err(VMError::TypeMismatch {
                        expected: *ty,
                        actual: val.get_type(),
                        context: format!("store to 0x{:x}", addr),
                    });
                }
                self.memory.write(addr, val);
            }

            Instruction::Call { dest, function, args, .. } => {
                let arg_values = self.collect_args(args)?;
                let result = self.dispatch_call(function, arg_values)?;
                self.frame_mut().set_value(*dest, result);
            }

            Instruction::CallVoid { function, args } => {
                let arg_values = self.collect_args(args)?;
                self.dispatch_call(function, arg_values)?;
            }

            Instruction::Const { dest, value, ty } => {
                let runtime_value = match ty {
                    Type::I32 => RuntimeValue::I32(*value as i32),
                    Type::I64 => RuntimeValue::I64(*value),
                    Type::Ptr => RuntimeValue::Ptr(*value as u64),
                    Type::Void => RuntimeValue::Void,
                    Type::F32 | Type::F64 => {
                        return Err(VMError::InvalidInstruction(
                            "Float types not yet supported".to_string(),
                        ));
                    }
                };
                self.frame_mut().set_value(*dest, runtime_value);
            }

            Instruction::BinaryOp {
                dest, op, lhs, rhs, ..
            } => {
                let frame = self.frame();
                let result = eval_binary(*op, frame.get_value(*lhs)?, frame.get_value(*rhs)?)?;
                self.frame_mut().set_value(*dest, result);
            }

            Instruction::UnaryOp {
                dest, op, operand, ..
            } => {
                let result = match (op, self.frame().get_value(*operand)?) {
                    (UnaryOperator::Neg, RuntimeValue::I32(a)) => RuntimeValue::I32(a.wrapping_neg()),
                    (UnaryOperator::Neg, RuntimeValue::I64(a)) => RuntimeValue::I64(a.wrapping_neg()),
                    (UnaryOperator::Not, RuntimeValue::I32(a)) => RuntimeValue::I32(!a),
                    (UnaryOperator::Not, RuntimeValue::I64(a)) => RuntimeValue::I64(!a),
                    (_, other) => {
                        return Err(VMError::TypeMismatch {
                            expected: Type::I32,
                            actual: other.get_type(),
                            context: format!("unary {} operation", op.mnemonic()),
                        });
                    }
                };
                self.frame_mut().set_value(*dest, result);
            }

            Instruction::PtrAdd { dest, ptr, offset } => {
                let base = self.pointer(*ptr, "pointer arithmetic base")?;
                let bytes = match self.frame().get_value(*offset)? {
                    RuntimeValue::I32(n) => *n as i64,
                    RuntimeValue::I64(n) => *n,
                    other => {
                        return Err(VMError::TypeMismatch {
                            expected: Type::I64,
                            actual: other.get_type(),
                            context: "pointer arithmetic offset".to_string(),
                        });
                    }
                };
                let result = RuntimeValue::Ptr(base.wrapping_add(bytes as u64));
                self.frame_mut().set_value(*dest, result);
            }
        }

        Ok(())
    }

    /// Host functions take precedence over program functions
    fn dispatch_call(&mut self, function: &str, args: Vec<RuntimeValue>) -> VMResult<RuntimeValue> {
        if self.host_abi.has_function(function) {
            self.host_abi
                .call_host_function(function, &args)
                .map_err(VMError::HostCallError)
        } else {
            self.call_function(function, args)
        }
    }
}

fn eval_binary(op: BinaryOperator, lhs: &RuntimeValue, rhs: &RuntimeValue) -> VMResult<RuntimeValue> {
    match (lhs, rhs) {
        (RuntimeValue::I32(a), RuntimeValue::I32(b)) => {
            if op.is_comparison() {
                return Ok(compare(op, *a as i64, *b as i64));
            }
            let value = match op {
                BinaryOperator::Add => a.wrapping_add(*b),
                BinaryOperator::Sub => a.wrapping_sub(*b),
                BinaryOperator::Mul => a.wrapping_mul(*b),
                BinaryOperator::Div | BinaryOperator::Rem if *b == 0 => return Err(VMError::DivisionByZero),
                BinaryOperator::Div => a.wrapping_div(*b),
                BinaryOperator::Rem => a.wrapping_rem(*b),
                BinaryOperator::And => a & b,
                BinaryOperator::Or => a | b,
                BinaryOperator::Xor => a ^ b,
                BinaryOperator::Shl => a.wrapping_shl(*b as u32),
                BinaryOperator::Shr => a.wrapping_shr(*b as u32),
                _ => unreachable!("comparisons handled above"),
            };
            Ok(RuntimeValue::I32(value))
        }
        (RuntimeValue::I64(a), RuntimeValue::I64(b)) => {
            if op.is_comparison() {
                return Ok(compare(op, *a, *b));
            }
            let value = match op {
                BinaryOperator::Add => a.wrapping_add(*b),
                BinaryOperator::Sub => a.wrapping_sub(*b),
                BinaryOperator::Mul => a.wrapping_mul(*b),
                BinaryOperator::Div | BinaryOperator::Rem if *b == 0 => return Err(VMError::DivisionByZero),
                BinaryOperator::Div => a.wrapping_div(*b),
                BinaryOperator::Rem => a.wrapping_rem(*b),
                BinaryOperator::And => a & b,
                BinaryOperator::Or => a | b,
                BinaryOperator::Xor => a ^ b,
                BinaryOperator::Shl => a.wrapping_shl(*b as u32),
                BinaryOperator::Shr => a.wrapping_shr(*b as u32),
                _ => unreachable!("comparisons handled above"),
            };
            Ok(RuntimeValue::I64(value))
        }
        (RuntimeValue::Ptr(a), RuntimeValue::Ptr(b))
            if matches!(op, BinaryOperator::Eq | BinaryOperator::Ne) =>
        {
            Ok(compare(op, (*a == *b) as i64, 1))
        }
        _ => Err(VMError::TypeMismatch {
            expected: lhs.get_type(),
            actual: rhs.get_type(),
            context: format!(
                "binary {} operation (lhs: {:?}, rhs: {:?})",
                op,
                lhs.get_type(),
                rhs.get_type()
            ),
        }),
    }
}

fn compare(op: BinaryOperator, a: i64, b: i64) -> RuntimeValue {
    let holds = match op {
        BinaryOperator::Eq => a == b,
        BinaryOperator::Ne => a != b,
        BinaryOperator::Lt => a < b,
        BinaryOperator::Le => a <= b,
        BinaryOperator::Gt => a > b,
        BinaryOperator::Ge => a >= b,
        _ => false,
    };
    RuntimeValue::I32(holds as i32)
}
