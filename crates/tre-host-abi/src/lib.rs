// ===================================================================
// FILE: lib.rs (tre-host-abi crate)
//
// DESC: Host ABI trait and runtime values for executing tre-ir in the
//       reference interpreter. Host functions are what the sample
//       programs call for output (print_arr and friends).
// ===================================================================

use tre_ir::Type;

/// Runtime values that can be passed between IR code and the host
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    I32(i32),
    I64(i64),
    Ptr(u64), // Interpreter address
    Void,
}

impl RuntimeValue {
    /// Get the IR type of this runtime value
    pub fn get_type(&self) -> Type {
        match self {
            RuntimeValue::I32(_) => Type::I32,
            RuntimeValue::I64(_) => Type::I64,
            RuntimeValue::Ptr(_) => Type::Ptr,
            RuntimeValue::Void => Type::Void,
        }
    }

    /// Try to extract an i32 value, returning None if the type doesn't match
    pub fn try_as_i32(&self) -> Option<i32> {
        match self {
            RuntimeValue::I32(val) => Some(*val),
            _ => None,
        }
    }

    /// Try to extract an i64 value, returning None if the type doesn't match
    pub fn try_as_i64(&self) -> Option<i64> {
        match self {
            RuntimeValue::I64(val) => Some(*val),
            _ => None,
        }
    }

    /// Try to extract a pointer value, returning None if the type doesn't match
    pub fn try_as_ptr(&self) -> Option<u64> {
        match self {
            RuntimeValue::Ptr(val) => Some(*val),
            _ => None,
        }
    }
}

/// Result type for host function calls
pub type HostResult = Result<RuntimeValue, String>;

/// Interface between IR programs and the environment running them.
pub trait HostABI {
    /// Call a host function by name with the given arguments
    fn call_host_function(&mut self, name: &str, args: &[RuntimeValue]) -> HostResult;

    /// Get a list of all available host functions
    fn available_functions(&self) -> Vec<&str>;

    /// Check if a host function is available
    fn has_function(&self, name: &str) -> bool {
        self.available_functions().contains(&name)
    }
}

const PRINT_FUNCTIONS: [&str; 4] = ["print_i32", "print_i64", "print_char", "println"];

/// Render a print call into text
fn render_print(name: &str, args: &[RuntimeValue]) -> Result<String, String> {
    let expect = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(format!("{} expects {} argument(s), got {}", name, n, args.len()))
        }
    };
    match name {
        "print_i32" => {
            expect(1)?;
            let value = args[0]
                .try_as_i32()
                .ok_or_else(|| format!("print_i32 expects i32, got {:?}", args[0]))?;
            Ok(value.to_string())
        }
        "print_i64" => {
            expect(1)?;
            let value = args[0]
                .try_as_i64()
                .ok_or_else(|| format!("print_i64 expects i64, got {:?}", args[0]))?;
            Ok(value.to_string())
        }
        "print_char" => {
            expect(1)?;
            let code = args[0]
                .try_as_i32()
                .ok_or_else(|| format!("print_char expects i32, got {:?}", args[0]))?;
            char::from_u32(code as u32)
                .map(|ch| ch.to_string())
                .ok_or_else(|| format!("Invalid character code: {}", code))
        }
        "println" => {
            expect(0)?;
            Ok("\n".to_string())
        }
        _ => Err(format!("Unknown host function: {}", name)),
    }
}

/// Host ABI that captures everything printed, so program output can be
/// compared before and after a transformation.
#[derive(Debug, Default)]
pub struct RecordingHostABI {
    output: String,
}

impl RecordingHostABI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl HostABI for RecordingHostABI {
    fn call_host_function(&mut self, name: &str, args: &[RuntimeValue]) -> HostResult {
        let text = render_print(name, args)?;
        self.output.push_str(&text);
        Ok(RuntimeValue::Void)
    }

    fn available_functions(&self) -> Vec<&str> {
        PRINT_FUNCTIONS.to_vec()
    }
}

/// A no-op host ABI for testing or isolated execution
pub struct NullHostABI;

impl NullHostABI {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullHostABI {
    fn default() -> Self {
        Self::new()
    }
}

impl HostABI for NullHostABI {
    fn call_host_function(&mut self, name: &str, _args: &[RuntimeValue]) -> HostResult {
        Err(format!("Null ABI: function '{}' not implemented", name))
    }

    fn available_functions(&self) -> Vec<&str> {
        vec![]
    }
}
