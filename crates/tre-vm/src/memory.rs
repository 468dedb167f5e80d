// ===================================================================
// FILE: memory.rs (tre-vm crate)
//
// DESC: Cell-addressed memory for the interpreter. Static data lives
//       in a low region that is never released; frame-local stack
//       memory grows upward from STACK_BASE and is released per frame.
// ===================================================================

use std::collections::BTreeMap;

use tre_host_abi::RuntimeValue;

use crate::{VMError, VMResult};

const STATIC_BASE: u64 = 0x1000;
const STACK_BASE: u64 = 0x1_0000_0000;

/// Values are stored whole at the address they were written to
#[derive(Debug)]
pub struct Memory {
    cells: BTreeMap<u64, RuntimeValue>,
    static_top: u64,
    stack_top: u64,
}

fn align8(size: u64) -> u64 {
    (size.max(1) + 7) & !7
}

impl Memory {
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
            static_top: STATIC_BASE,
            stack_top: STACK_BASE,
        }
    }

    /// Place `values` contiguously in static memory, `stride` bytes apart,
    /// and return the address of the first element.
    pub fn alloc_static(&mut self, values: &[RuntimeValue], stride: u64) -> u64 {
        let base = self.static_top;
        for (i, value) in values.iter().enumerate() {
            self.cells.insert(base + i as u64 * stride, value.clone());
        }
        self.static_top += align8(stride * values.len() as u64);
        base
    }

    /// Reserve `size` bytes of stack memory
    pub fn push_stack(&mut self, size: u64) -> u64 {
        let address = self.stack_top;
        self.stack_top += align8(size);
        address
    }

    /// Current top of the stack, to be handed back to [`Memory::release_stack`]
    pub fn stack_mark(&self) -> u64 {
        self.stack_top
    }

    /// Pop every stack allocation made since `mark`
    pub fn release_stack(&mut self, mark: u64) {
        let _released = self.cells.split_off(&mark);
        self.stack_top = mark;
    }

    /// Bytes of stack memory currently reserved
    pub fn stack_in_use(&self) -> u64 {
        self.stack_top - STACK_BASE
    }

    pub fn read(&self, address: u64) -> VMResult<RuntimeValue> {
        self.cells
            .get(&address)
            .cloned()
            .ok_or(VMError::UninitializedMemory(address))
    }

    pub fn write(&mut self, address: u64, value: RuntimeValue) {
        self.cells.insert(address, value);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
