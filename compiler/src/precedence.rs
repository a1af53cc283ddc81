use core::bytecode::OpCode;
use core::errors::{CompileError, CompileErrorKind};
use core::tokens::{Token, TokenKind};

use crate::Compiler;

/// Returns the binding precedence of `tok` if it is a binary operator,
/// defaulting unrecognized operator lexemes to the lowest precedence (1)
/// the way `&&`/`||` sit, rather than rejecting them outright; whether the
/// lexeme is actually a known operator is checked separately when the
/// opcode is emitted.
fn binary_precedence(tok: &Token) -> Option<u8> {
  if !tok.is(TokenKind::Operator) {
    return None;
  }
  Some(match tok.lexeme {
    "*" | "/" | "%" => 5,
    "+" | "-" => 4,
    "<" | ">" | "<=" | ">=" => 3,
    "==" | "!=" => 2,
    "&&" | "||" => 1,
    _ => 1,
  })
}

impl<'a> Compiler<'a> {
  /// Parses an expression using precedence climbing (an iterative
  /// formulation of Dijkstra's shunting-yard): a unary/primary operand
  /// followed by zero or more binary operators, each recursing one level
  /// deeper for operators that bind at least as tight as `min_prec`.
  pub(crate) fn compile_expression(&mut self, min_prec: u8) -> Result<(), CompileError> {
    self.compile_unary()?;

    loop {
      let prec = match binary_precedence(&self.current()) {
        Some(p) if p >= min_prec => p,
        _ => break,
      };
      let op = self.advance()?;
      self.compile_expression(prec + 1)?;
      self.emit_binary_op(op)?;
    }

    Ok(())
  }

  fn emit_binary_op(&mut self, op: Token) -> Result<(), CompileError> {
    let code = match op.lexeme {
      "+" => OpCode::ADD,
      "-" => OpCode::SUB,
      "*" => OpCode::MUL,
      "/" => OpCode::DIV,
      "%" => OpCode::MOD,
      "<" => OpCode::LT,
      ">" => OpCode::GT,
      "<=" => OpCode::LTE,
      ">=" => OpCode::GTE,
      "==" => OpCode::EQUALS,
      "!=" => OpCode::NOT_EQUALS,
      "&&" => OpCode::AND,
      "||" => OpCode::OR,
      _ => return Err(self.err(CompileErrorKind::UnknownOperator)),
    };
    self.chunk.emit_op(code, op.line);
    Ok(())
  }

  fn compile_unary(&mut self) -> Result<(), CompileError> {
    if self.check(TokenKind::Operator) && self.current().lexeme == "-" {
      let op = self.advance()?;
      self.chunk.emit_op(OpCode::NUM_PUSH, op.line);
      self.chunk.emit_f64(0.0, op.line);
      self.compile_unary()?;
      self.chunk.emit_op(OpCode::SUB, op.line);
      return Ok(());
    }

    if self.check(TokenKind::Operator) && self.current().lexeme == "!" {
      let op = self.advance()?;
      self.compile_unary()?;
      self.chunk.emit_op(OpCode::NOT, op.line);
      return Ok(());
    }

    self.compile_primary()
  }

  fn compile_primary(&mut self) -> Result<(), CompileError> {
    if self.check(TokenKind::Number) {
      let tok = self.advance()?;
      let value = core::utils::parse_number_lexeme(tok.lexeme)
        .map_err(|_| CompileError { kind: CompileErrorKind::UnexpectedToken, line: tok.line })?;
      self.chunk.emit_op(OpCode::NUM_PUSH, tok.line);
      self.chunk.emit_f64(value, tok.line);
      return Ok(());
    }

    if self.check(TokenKind::String) {
      let tok = self.advance()?;
      if tok.lexeme.len() > core::GS_MAX_STRING_LEN {
        return Err(CompileError { kind: CompileErrorKind::StringTooLong, line: tok.line });
      }
      self.chunk.emit_op(OpCode::STR_PUSH, tok.line);
      self.chunk.emit_u8(tok.lexeme.len() as u8, tok.line);
      self.chunk.emit_bytes(tok.lexeme.as_bytes(), tok.line);
      return Ok(());
    }

    if self.check(TokenKind::Parenthesis) && self.current().lexeme == "(" {
      self.advance()?;
      self.compile_expression(1)?;
      self.expect_lexeme(TokenKind::Parenthesis, ")", CompileErrorKind::UnmatchedParenthesis)?;
      return Ok(());
    }

    if self.check(TokenKind::KeyVar) {
      return self.compile_keyvar_primary();
    }

    Err(self.err(CompileErrorKind::UnexpectedToken))
  }

  fn compile_keyvar_primary(&mut self) -> Result<(), CompileError> {
    let tok = self.advance()?;

    match tok.lexeme {
      "true" => {
        self.chunk.emit_op(OpCode::BOOL_PUSH, tok.line);
        self.chunk.emit_u8(1, tok.line);
        return Ok(());
      }
      "false" => {
        self.chunk.emit_op(OpCode::BOOL_PUSH, tok.line);
        self.chunk.emit_u8(0, tok.line);
        return Ok(());
      }
      "null" => {
        self.chunk.emit_op(OpCode::NULL_PUSH, tok.line);
        return Ok(());
      }
      _ => {}
    }

    if self.check(TokenKind::Parenthesis) && self.current().lexeme == "(" {
      let arg_count = self.compile_call_arguments()?;
      return self.compile_call(tok.lexeme, arg_count, tok.line);
    }

    match self.resolve(tok.lexeme) {
      Some((depth, slot)) => {
        self.chunk.emit_op(OpCode::VAR_PUSH, tok.line);
        self.chunk.emit_u8(depth, tok.line);
        self.chunk.emit_u8(slot, tok.line);
        Ok(())
      }
      None => Err(CompileError {
        kind: CompileErrorKind::UndefinedVariable(tok.lexeme.to_string()),
        line: tok.line,
      }),
    }
  }

  /// Consumes `"(" [Expression {"," Expression}] ")"`, compiling each
  /// argument expression left to right (so they land on the operand stack
  /// in the order `CALL_SCRIPT`/`CALL_NATIVE` expect to pop them in
  /// reverse), and returns how many were compiled.
  fn compile_call_arguments(&mut self) -> Result<usize, CompileError> {
    self.expect_lexeme(TokenKind::Parenthesis, "(", CompileErrorKind::ExpectedOpenParenthesis)?;

    let mut count = 0usize;
    if !(self.check(TokenKind::Parenthesis) && self.current().lexeme == ")") {
      loop {
        self.compile_expression(1)?;
        count += 1;
        if self.check(TokenKind::ArgDelim) {
          self.advance()?;
          continue;
        }
        break;
      }
    }

    self.expect_lexeme(TokenKind::Parenthesis, ")", CompileErrorKind::ExpectedOpenParenthesis)?;
    Ok(count)
  }
}
