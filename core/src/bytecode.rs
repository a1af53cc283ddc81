//! The instruction set and the append-only buffer the compiler emits into.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// The set of instructions supported by the virtual machine.
///
/// **NOTE:** changing the order of these variants breaks compatibility with
/// previously compiled `.gxb` files; bump [`crate::VERSION`] if you do.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum OpCode {
  /// `VAR_PUSH d s` — push the value at (depth `d`, slot `s`) of the frame stack.
  VAR_PUSH,
  /// `VAR_STOR d s` — peek the operand stack and store into (depth `d`, slot `s`).
  VAR_STOR,
  /// `FRM_PUSH n` — push a non-function frame with `n` slots.
  FRM_PUSH,
  /// `FRM_POP` — pop the current frame, jumping to its return address if it has one.
  FRM_POP,
  /// `CALL_SCRIPT n a addr` — call a script function.
  CALL_SCRIPT,
  /// `CALL_NATIVE a idx` — call a registered native callback.
  CALL_NATIVE,
  ADD,
  SUB,
  MUL,
  DIV,
  MOD,
  LT,
  GT,
  LTE,
  GTE,
  EQUALS,
  NOT_EQUALS,
  AND,
  OR,
  NOT,
  /// `NUM_PUSH v` — push a number literal.
  NUM_PUSH,
  /// `BOOL_PUSH b` — push a boolean literal (`b` must be 0 or 1).
  BOOL_PUSH,
  /// `STR_PUSH n <n bytes>` — allocate a string host object and push it.
  STR_PUSH,
  NULL_PUSH,
  /// `GOTO addr` — unconditional jump.
  GOTO,
  /// `TCOND_GOTO addr` — pop a boolean, jump if true.
  TCOND_GOTO,
  /// `FCOND_GOTO addr` — pop a boolean, jump if false.
  FCOND_GOTO,
  POP,
  EXIT,
}

impl OpCode {
  pub fn from_byte(byte: u8) -> Option<OpCode> {
    FromPrimitive::from_u8(byte)
  }
}

/// An append-only byte buffer with random-access patch, used by the
/// compiler to emit code and back-patch jump targets. Also records the
/// source line of the token that produced each instruction, so runtime
/// errors can be attributed to a line number.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
  code: Vec<u8>,
  lines: Vec<usize>,
}

impl Chunk {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.code.len()
  }

  pub fn is_empty(&self) -> bool {
    self.code.is_empty()
  }

  pub fn code(&self) -> &[u8] {
    &self.code
  }

  pub fn into_code(self) -> Vec<u8> {
    self.code
  }

  /// The source line that produced the instruction at `offset`, if any.
  pub fn line_at(&self, offset: usize) -> Option<usize> {
    self.lines.get(offset).copied()
  }

  fn push(&mut self, byte: u8, line: usize) {
    self.code.push(byte);
    self.lines.push(line);
  }

  pub fn emit_op(&mut self, op: OpCode, line: usize) {
    self.push(op as u8, line);
  }

  pub fn emit_u8(&mut self, val: u8, line: usize) {
    self.push(val, line);
  }

  pub fn emit_i32(&mut self, val: i32, line: usize) {
    for b in val.to_le_bytes() {
      self.push(b, line);
    }
  }

  pub fn emit_f64(&mut self, val: f64, line: usize) {
    for b in val.to_le_bytes() {
      self.push(b, line);
    }
  }

  pub fn emit_bytes(&mut self, bytes: &[u8], line: usize) {
    for &b in bytes {
      self.push(b, line);
    }
  }

  /// Records the current length, to be used as a patch site later (e.g. for
  /// an as-yet-unresolved jump target).
  pub fn mark(&self) -> usize {
    self.code.len()
  }

  /// Overwrites the 4 bytes at `offset` with `val`, used to back-patch a
  /// jump emitted earlier via [`Chunk::emit_i32`].
  pub fn patch_i32(&mut self, offset: usize, val: i32) {
    let bytes = val.to_le_bytes();
    self.code[offset..offset + 4].copy_from_slice(&bytes);
  }

  /// Overwrites a single byte at `offset`, used to back-patch a forward
  /// call site's `total_slots` operand once the callee is fully compiled.
  pub fn patch_u8(&mut self, offset: usize, val: u8) {
    self.code[offset] = val;
  }

  pub fn read_u8(&self, offset: usize) -> u8 {
    self.code[offset]
  }

  pub fn read_i32(&self, offset: usize) -> i32 {
    i32::from_le_bytes(self.code[offset..offset + 4].try_into().unwrap())
  }

  pub fn read_f64(&self, offset: usize) -> f64 {
    f64::from_le_bytes(self.code[offset..offset + 8].try_into().unwrap())
  }

  /// Appends another chunk's code after this one, shifting nothing; used to
  /// concatenate separately-compiled units (the only "module system" this
  /// language has, per spec).
  pub fn append(&mut self, other: &Chunk) {
    self.code.extend_from_slice(&other.code);
    self.lines.extend_from_slice(&other.lines);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn opcode_round_trips_through_from_byte() {
    assert_eq!(OpCode::from_byte(OpCode::CALL_NATIVE as u8), Some(OpCode::CALL_NATIVE));
    assert_eq!(OpCode::from_byte(OpCode::EXIT as u8), Some(OpCode::EXIT));
  }

  #[test]
  fn from_byte_rejects_out_of_range_values() {
    assert_eq!(OpCode::from_byte(255), None);
  }

  #[test]
  fn patch_i32_overwrites_a_placeholder_in_place() {
    let mut chunk = Chunk::new();
    chunk.emit_op(OpCode::GOTO, 1);
    let mark = chunk.mark();
    chunk.emit_i32(-1, 1);
    chunk.emit_op(OpCode::EXIT, 1);

    chunk.patch_i32(mark, 42);

    assert_eq!(chunk.read_i32(mark), 42);
    assert_eq!(chunk.len(), 1 + 4 + 1);
  }

  #[test]
  fn append_concatenates_code_and_lines() {
    let mut a = Chunk::new();
    a.emit_op(OpCode::NULL_PUSH, 1);
    let mut b = Chunk::new();
    b.emit_op(OpCode::EXIT, 2);

    a.append(&b);

    assert_eq!(a.len(), 2);
    assert_eq!(a.line_at(1), Some(2));
  }

  #[test]
  fn emit_f64_round_trips() {
    let mut chunk = Chunk::new();
    chunk.emit_f64(7.0, 1);
    assert_eq!(chunk.read_f64(0), 7.0);
  }
}
