//! The stack-based virtual machine (C4): an operand stack, a frame stack of
//! scoped variable slots, a native-callback table, and a dispatch loop that
//! enforces type rules at each opcode.

mod arithmetic;
mod frame;
mod run;

use hashbrown::HashMap;

use core::errors::RuntimeErrorKind;
use objects::Value;

pub use frame::Frame;

/// A native callback registered by the host. Mirrors the `(vm, args) ->
/// result` shape of the C ABI this system is built around, adapted to push
/// its own result through a `Result` instead of a raw boolean plus
/// out-of-band stack manipulation: `Ok(Some(v))` pushes `v`, `Ok(None)`
/// pushes nothing, `Err(e)` aborts the VM loop with `e`.
pub type NativeFn = fn(&mut Vm, &[Value]) -> Result<Option<Value>, RuntimeErrorKind>;

/// Everything needed to call a script-defined function: where its code
/// starts, how many arguments it takes, and the total number of frame
/// slots (arguments plus locals) it needs.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
  pub name: String,
  pub entry: i32,
  pub arg_count: i32,
  pub total_slots: i32,
  pub exported: bool,
}

/// The fixed-capacity table of native callbacks. Registration happens
/// before the first `execute_function` call and the table is immutable
/// after that (§5 of the design document).
pub struct NativeRegistry {
  names: HashMap<String, usize>,
  callbacks: Vec<NativeFn>,
  capacity: usize,
}

impl NativeRegistry {
  pub fn new(capacity: usize) -> Self {
    NativeRegistry { names: HashMap::new(), callbacks: Vec::with_capacity(capacity), capacity }
  }

  /// Registers `callback` under `name`, returning its numeric index (the
  /// same index the compiler will embed in `CALL_NATIVE`).
  pub fn register(&mut self, name: &str, callback: NativeFn) -> Result<usize, RuntimeErrorKind> {
    if self.names.contains_key(name) {
      return Err(RuntimeErrorKind::DuplicateCallback);
    }
    if self.callbacks.len() >= self.capacity {
      return Err(RuntimeErrorKind::CallbackBufferFull);
    }
    let idx = self.callbacks.len();
    self.callbacks.push(callback);
    self.names.insert(name.to_string(), idx);
    Ok(idx)
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.names.get(name).copied()
  }

  pub fn get(&self, idx: usize) -> Option<NativeFn> {
    self.callbacks.get(idx).copied()
  }

  pub fn len(&self) -> usize {
    self.callbacks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.callbacks.is_empty()
  }
}

/// The virtual machine. One instance owns one operand stack, one frame
/// stack, the native callback table, and the script function table. It
/// interprets a single bytecode buffer to completion or to the first
/// runtime error; there is no suspension or re-entrancy.
pub struct Vm {
  code: Vec<u8>,
  ip: usize,
  operand_stack: Vec<Value>,
  operand_stack_max: usize,
  frame_stack: Vec<Frame>,
  natives: NativeRegistry,
  functions: HashMap<String, FunctionDescriptor>,
  error: Option<RuntimeErrorKind>,
}

impl Vm {
  pub fn new(operand_stack_max: usize, native_capacity: usize) -> Self {
    Vm {
      code: Vec::new(),
      ip: 0,
      operand_stack: Vec::new(),
      operand_stack_max,
      frame_stack: Vec::new(),
      natives: NativeRegistry::new(native_capacity),
      functions: HashMap::new(),
      error: None,
    }
  }

  pub fn natives(&self) -> &NativeRegistry {
    &self.natives
  }

  pub fn natives_mut(&mut self) -> &mut NativeRegistry {
    &mut self.natives
  }

  pub fn functions(&self) -> &HashMap<String, FunctionDescriptor> {
    &self.functions
  }

  /// Installs the compiled bytecode and its exported/non-exported function
  /// table. Replaces whatever was previously loaded; concatenating
  /// multiple compiled units happens before this call, in the byte buffer
  /// the caller hands over.
  pub fn load(&mut self, code: Vec<u8>, functions: HashMap<String, FunctionDescriptor>) {
    self.code = code;
    self.functions = functions;
  }

  pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
    self.functions.get(name)
  }

  pub fn error(&self) -> Option<RuntimeErrorKind> {
    self.error
  }

  pub fn operand_stack(&self) -> &[Value] {
    &self.operand_stack
  }

  pub fn frame_stack_depth(&self) -> usize {
    self.frame_stack.len()
  }

  fn set_err(&mut self, err: RuntimeErrorKind) -> Result<(), RuntimeErrorKind> {
    self.error = Some(err);
    Err(err)
  }

  fn push_operand(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
    if self.operand_stack.len() >= self.operand_stack_max {
      return self.set_err(RuntimeErrorKind::StackOverflow);
    }
    self.operand_stack.push(value);
    Ok(())
  }

  fn pop_operand(&mut self) -> Result<Value, RuntimeErrorKind> {
    self.operand_stack.pop().ok_or(RuntimeErrorKind::OperandStackEmpty)
  }

  fn peek_operand(&self) -> Result<&Value, RuntimeErrorKind> {
    self.operand_stack.last().ok_or(RuntimeErrorKind::OperandStackEmpty)
  }

  /// Looks up the function named `name` and runs it to completion. Per
  /// §5, this runs synchronously: it returns only once the script has
  /// finished or hit a runtime error.
  pub fn execute_function(&mut self, name: &str) -> Result<(), RuntimeErrorKind> {
    let func = self.functions.get(name).cloned().ok_or(RuntimeErrorKind::NonexistentCallback)?;

    self.operand_stack.clear();
    self.frame_stack.clear();
    self.error = None;

    self.frame_stack.push(Frame::new(None, func.total_slots as usize));
    self.ip = func.entry as usize;

    self.run()
  }
}

#[cfg(test)]
mod tests {
  use core::bytecode::{Chunk, OpCode};

  use super::*;

  fn exported(entry: i32) -> FunctionDescriptor {
    FunctionDescriptor { name: "main".to_string(), entry, arg_count: 0, total_slots: 0, exported: true }
  }

  #[test]
  fn adds_two_number_literals() {
    let mut chunk = Chunk::new();
    chunk.emit_op(OpCode::NUM_PUSH, 1);
    chunk.emit_f64(2.0, 1);
    chunk.emit_op(OpCode::NUM_PUSH, 1);
    chunk.emit_f64(3.0, 1);
    chunk.emit_op(OpCode::ADD, 1);
    chunk.emit_op(OpCode::EXIT, 1);

    let mut vm = Vm::new(16, 4);
    vm.load(chunk.into_code(), [("main".to_string(), exported(0))].into_iter().collect());
    vm.execute_function("main").unwrap();

    assert_eq!(vm.operand_stack().last().unwrap().as_number(), Some(5.0));
  }

  #[test]
  fn divide_by_zero_is_a_runtime_error() {
    let mut chunk = Chunk::new();
    chunk.emit_op(OpCode::NUM_PUSH, 1);
    chunk.emit_f64(1.0, 1);
    chunk.emit_op(OpCode::NUM_PUSH, 1);
    chunk.emit_f64(0.0, 1);
    chunk.emit_op(OpCode::DIV, 1);
    chunk.emit_op(OpCode::EXIT, 1);

    let mut vm = Vm::new(16, 4);
    vm.load(chunk.into_code(), [("main".to_string(), exported(0))].into_iter().collect());

    let err = vm.execute_function("main").unwrap_err();
    assert_eq!(err, RuntimeErrorKind::DivideByZero);
    assert_eq!(vm.error(), Some(RuntimeErrorKind::DivideByZero));
  }

  #[test]
  fn calls_a_registered_native_with_arguments_in_declared_order() {
    fn record_order(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
      let (Some(a), Some(b)) = (args[0].as_number(), args[1].as_number()) else {
        return Err(RuntimeErrorKind::InvalidTypeInOperation);
      };
      Ok(Some(Value::Number(a - b)))
    }

    let mut vm = Vm::new(16, 4);
    let idx = vm.natives_mut().register("sub", record_order).unwrap();

    let mut chunk = Chunk::new();
    chunk.emit_op(OpCode::NUM_PUSH, 1);
    chunk.emit_f64(10.0, 1);
    chunk.emit_op(OpCode::NUM_PUSH, 1);
    chunk.emit_f64(4.0, 1);
    chunk.emit_op(OpCode::CALL_NATIVE, 1);
    chunk.emit_u8(2, 1);
    chunk.emit_i32(idx as i32, 1);
    chunk.emit_op(OpCode::EXIT, 1);

    vm.load(chunk.into_code(), [("main".to_string(), exported(0))].into_iter().collect());
    vm.execute_function("main").unwrap();

    assert_eq!(vm.operand_stack().last().unwrap().as_number(), Some(6.0));
  }

  #[test]
  fn unknown_opcode_byte_is_a_runtime_error() {
    let mut vm = Vm::new(16, 4);
    vm.load(vec![255], [("main".to_string(), exported(0))].into_iter().collect());
    let err = vm.execute_function("main").unwrap_err();
    assert_eq!(err, RuntimeErrorKind::InvalidOpcode);
  }
}
