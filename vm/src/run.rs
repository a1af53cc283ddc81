use core::bytecode::OpCode;
use core::errors::RuntimeErrorKind;
use objects::{LibData, Value};

use crate::{Frame, Vm};

impl Vm {
  fn read_u8(&mut self) -> Result<u8, RuntimeErrorKind> {
    let byte = *self.code.get(self.ip).ok_or(RuntimeErrorKind::UnexpectedEndOfCode)?;
    self.ip += 1;
    Ok(byte)
  }

  fn read_i32(&mut self) -> Result<i32, RuntimeErrorKind> {
    let end = self.ip + 4;
    let bytes: [u8; 4] = self
      .code
      .get(self.ip..end)
      .ok_or(RuntimeErrorKind::UnexpectedEndOfCode)?
      .try_into()
      .unwrap();
    self.ip = end;
    Ok(i32::from_le_bytes(bytes))
  }

  fn read_f64(&mut self) -> Result<f64, RuntimeErrorKind> {
    let end = self.ip + 8;
    let bytes: [u8; 8] = self
      .code
      .get(self.ip..end)
      .ok_or(RuntimeErrorKind::UnexpectedEndOfCode)?
      .try_into()
      .unwrap();
    self.ip = end;
    Ok(f64::from_le_bytes(bytes))
  }

  fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, RuntimeErrorKind> {
    let end = self.ip + n;
    let slice = self.code.get(self.ip..end).ok_or(RuntimeErrorKind::UnexpectedEndOfCode)?;
    let out = slice.to_vec();
    self.ip = end;
    Ok(out)
  }

  fn jump_target(&self, addr: i32) -> Result<usize, RuntimeErrorKind> {
    if addr < 0 || addr as usize >= self.code.len() {
      return Err(RuntimeErrorKind::InvalidAddress);
    }
    Ok(addr as usize)
  }

  /// Reads the frame at `depth` frames below the top of the frame stack
  /// (`depth == 0` is the current frame). Gunderscript functions may read
  /// enclosing scopes' variables by depth, the way nested `FRM_PUSH` blocks
  /// (if/while bodies) share the enclosing function's frame stack.
  fn frame_at_depth(&self, depth: u8) -> Result<&Frame, RuntimeErrorKind> {
    let len = self.frame_stack.len();
    let idx = len.checked_sub(1 + depth as usize).ok_or(RuntimeErrorKind::FrameVarAccessFailed)?;
    Ok(&self.frame_stack[idx])
  }

  fn frame_at_depth_mut(&mut self, depth: u8) -> Result<&mut Frame, RuntimeErrorKind> {
    let len = self.frame_stack.len();
    let idx = len.checked_sub(1 + depth as usize).ok_or(RuntimeErrorKind::FrameVarAccessFailed)?;
    Ok(&mut self.frame_stack[idx])
  }

  /// The main dispatch loop: fetch an opcode, decode its operands, execute
  /// it, repeat until `EXIT` or a runtime error.
  pub(super) fn run(&mut self) -> Result<(), RuntimeErrorKind> {
    loop {
      let byte = self.read_u8()?;
      let op = OpCode::from_byte(byte).ok_or(RuntimeErrorKind::InvalidOpcode).map_err(|e| {
        self.error = Some(e);
        e
      })?;

      match op {
        OpCode::VAR_PUSH => {
          let depth = self.read_u8()?;
          let slot = self.read_u8()? as usize;
          let frame = self.frame_at_depth(depth)?;
          let value = match frame.get(slot) {
            Some(v) => v.clone(),
            None => return Err(self.fail(RuntimeErrorKind::FrameVarAccessFailed)),
          };
          self.push_operand(value)?;
        }

        OpCode::VAR_STOR => {
          let depth = self.read_u8()?;
          let slot = self.read_u8()? as usize;
          let value = self.peek_operand()?.clone();
          let stored = self.frame_at_depth_mut(depth)?.set(slot, value);
          if !stored {
            return Err(self.fail(RuntimeErrorKind::FrameVarAccessFailed));
          }
        }

        OpCode::FRM_PUSH => {
          let n = self.read_u8()? as usize;
          if self.frame_stack.len() >= core::FRAMES_MAX {
            return Err(self.fail(RuntimeErrorKind::StackOverflow));
          }
          self.frame_stack.push(Frame::new(None, n));
        }

        OpCode::FRM_POP => {
          let frame = match self.frame_stack.pop() {
            Some(f) => f,
            None => return Err(self.fail(RuntimeErrorKind::FrameStackEmpty)),
          };
          if let Some(addr) = frame.return_address {
            self.ip = addr;
          }
        }

        OpCode::CALL_SCRIPT => {
          let total_slots = self.read_u8()? as usize;
          let arg_count = self.read_u8()? as usize;
          let addr = self.read_i32()?;
          let target = self.jump_target(addr).map_err(|e| self.fail(e))?;

          if self.frame_stack.len() >= core::FRAMES_MAX {
            return Err(self.fail(RuntimeErrorKind::StackOverflow));
          }

          let mut frame = Frame::new(Some(self.ip), total_slots);
          for i in (0..arg_count).rev() {
            let arg = self.pop_operand()?;
            frame.set(i, arg);
          }
          self.frame_stack.push(frame);
          self.ip = target;
        }

        OpCode::CALL_NATIVE => {
          let arg_count = self.read_u8()? as usize;
          if arg_count > core::VM_MAX_NARGS {
            return Err(self.fail(RuntimeErrorKind::InvalidOpcodeParameter));
          }
          let idx = self.read_i32()? as usize;
          let callback = self.natives.get(idx).ok_or(RuntimeErrorKind::NonexistentCallback).map_err(|e| self.fail(e))?;

          let mut args = Vec::with_capacity(arg_count);
          for _ in 0..arg_count {
            args.push(self.pop_operand()?);
          }
          args.reverse();

          match callback(self, &args) {
            Ok(Some(result)) => self.push_operand(result)?,
            Ok(None) => {}
            Err(e) => return Err(self.fail(e)),
          }
        }

        OpCode::ADD => self.perform_add()?,
        OpCode::SUB => self.perform_sub()?,
        OpCode::MUL => self.perform_mul()?,
        OpCode::DIV => self.perform_div()?,
        OpCode::MOD => self.perform_mod()?,
        OpCode::LT => self.perform_compare(|a, b| a < b)?,
        OpCode::GT => self.perform_compare(|a, b| a > b)?,
        OpCode::LTE => self.perform_compare(|a, b| a <= b)?,
        OpCode::GTE => self.perform_compare(|a, b| a >= b)?,
        OpCode::EQUALS => self.perform_equals(false)?,
        OpCode::NOT_EQUALS => self.perform_equals(true)?,
        OpCode::AND => self.perform_and()?,
        OpCode::OR => self.perform_or()?,
        OpCode::NOT => self.perform_not()?,

        OpCode::NUM_PUSH => {
          let val = self.read_f64()?;
          self.push_operand(Value::Number(val))?;
        }

        OpCode::BOOL_PUSH => {
          let byte = self.read_u8()?;
          if byte > 1 {
            return Err(self.fail(RuntimeErrorKind::InvalidOpcodeParameter));
          }
          self.push_operand(Value::Boolean(byte == 1))?;
        }

        OpCode::STR_PUSH => {
          let len = self.read_u8()? as usize;
          let bytes = self.read_bytes(len)?;
          let text = String::from_utf8_lossy(&bytes).into_owned();
          self.push_operand(Value::LibData(LibData::new(objects::StrObject::new(text))))?;
        }

        OpCode::NULL_PUSH => self.push_operand(Value::Null)?,

        OpCode::GOTO => {
          let addr = self.read_i32()?;
          self.ip = self.jump_target(addr).map_err(|e| self.fail(e))?;
        }

        OpCode::TCOND_GOTO => {
          let addr = self.read_i32()?;
          let cond = self.pop_operand()?.as_boolean().ok_or(RuntimeErrorKind::InvalidTypeInOperation).map_err(|e| self.fail(e))?;
          if cond {
            self.ip = self.jump_target(addr).map_err(|e| self.fail(e))?;
          }
        }

        OpCode::FCOND_GOTO => {
          let addr = self.read_i32()?;
          let cond = self.pop_operand()?.as_boolean().ok_or(RuntimeErrorKind::InvalidTypeInOperation).map_err(|e| self.fail(e))?;
          if !cond {
            self.ip = self.jump_target(addr).map_err(|e| self.fail(e))?;
          }
        }

        OpCode::POP => {
          self.pop_operand()?;
        }

        OpCode::EXIT => return Ok(()),
      }
    }
  }

  fn fail(&mut self, err: RuntimeErrorKind) -> RuntimeErrorKind {
    self.error = Some(err);
    err
  }
}
