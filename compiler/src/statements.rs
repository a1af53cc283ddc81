use core::bytecode::OpCode;
use core::errors::{CompileError, CompileErrorKind};
use core::tokens::TokenKind;

use crate::symbols::SymbolTable;
use crate::Compiler;

impl<'a> Compiler<'a> {
  /// Compiles a function's own block: `{ { VarDecl } { Statement } }`. No
  /// frame is pushed here — `CALL_SCRIPT`/`execute_function` already did
  /// that with room for both the parameters (already declared by the
  /// caller) and these locals. Returns whether the last top-level
  /// statement was a `return`, so the caller can skip the implicit
  /// `null`-return epilogue.
  pub(crate) fn compile_function_body(&mut self) -> Result<bool, CompileError> {
    self.expect_lexeme(TokenKind::Brackets, "{", CompileErrorKind::ExpectedOpenBracket)?;

    self.compile_var_decls()?;

    let mut last_was_return = false;
    while !(self.check(TokenKind::Brackets) && self.current().lexeme == "}") {
      if self.check(TokenKind::Eof) {
        return Err(self.err(CompileErrorKind::ExpectedCloseBracket));
      }
      last_was_return = self.compile_statement()?;
    }
    self.advance()?;

    Ok(last_was_return)
  }

  /// Compiles a nested `Block` used as a `Statement`: pushes its own frame
  /// (since nothing else will), compiles its contents, and pops the frame.
  fn compile_nested_block(&mut self) -> Result<(), CompileError> {
    self.expect_lexeme(TokenKind::Brackets, "{", CompileErrorKind::ExpectedOpenBracket)?;

    self.scopes.push(SymbolTable::new());
    self.compile_var_decls()?;

    // Every `var` in this block was declared above, so its slot count is
    // already final here; no placeholder/patch needed.
    let local_count = self.scopes.last().expect("block scope pushed above").len() as u8;
    self.chunk.emit_op(OpCode::FRM_PUSH, self.line());
    self.chunk.emit_u8(local_count, self.line());

    while !(self.check(TokenKind::Brackets) && self.current().lexeme == "}") {
      if self.check(TokenKind::Eof) {
        return Err(self.err(CompileErrorKind::ExpectedCloseBracket));
      }
      self.compile_statement()?;
    }
    self.advance()?;

    self.scopes.pop();
    self.chunk.emit_op(OpCode::FRM_POP, self.line());

    Ok(())
  }

  /// `{ VarDecl }` — a contiguous run of `"var" Ident ";"` at the top of a
  /// block. Each declares a slot in the block's (already-pushed) scope;
  /// no bytecode is emitted since frame slots start out `Null`.
  fn compile_var_decls(&mut self) -> Result<(), CompileError> {
    while self.check_keyword("var") {
      self.advance()?;
      let name_tok = self.expect(TokenKind::KeyVar, CompileErrorKind::ExpectedVarName)?;
      let line = name_tok.line;
      let name = name_tok.lexeme.to_string();
      self.scopes.last_mut().expect("a scope is always active while compiling a body").declare(&name, line)?;
      self.expect(TokenKind::EndStatement, CompileErrorKind::ExpectedEndStatement)?;
    }
    Ok(())
  }

  /// `Statement := Block | IfStmt | WhileStmt | DoWhileStmt | Expression ";"`.
  /// Returns whether this statement was a top-level `return`.
  pub(crate) fn compile_statement(&mut self) -> Result<bool, CompileError> {
    if self.check(TokenKind::Brackets) && self.current().lexeme == "{" {
      self.compile_nested_block()?;
      return Ok(false);
    }
    if self.check_keyword("if") {
      self.compile_if_stmt()?;
      return Ok(false);
    }
    if self.check_keyword("while") {
      self.compile_while_stmt()?;
      return Ok(false);
    }
    if self.check_keyword("do") {
      self.compile_do_while_stmt()?;
      return Ok(false);
    }
    self.compile_expression_statement()
  }

  /// An assignment (`name = expr`), a `return` pseudo-call, or a plain
  /// expression, each followed by `;`. Per the resolved peek-semantics of
  /// `VAR_STOR`, a plain statement's expression value is left on the
  /// operand stack and then discarded with `POP`; `return` instead hands
  /// that value to the caller via `FRM_POP` and so is not followed by a
  /// `POP` of its own.
  fn compile_expression_statement(&mut self) -> Result<bool, CompileError> {
    if self.check_keyword("return") {
      let tok = self.advance()?;
      self.compile_expression(1)?;
      self.expect(TokenKind::EndStatement, CompileErrorKind::ExpectedEndStatement)?;
      self.chunk.emit_op(OpCode::FRM_POP, tok.line);
      return Ok(true);
    }

    if self.check(TokenKind::KeyVar) && self.peek().is(TokenKind::Operator) && self.peek().lexeme == "=" {
      let name_tok = self.advance()?;
      self.advance()?; // '='
      let (depth, slot) = self
        .resolve(name_tok.lexeme)
        .ok_or_else(|| CompileError {
          kind: CompileErrorKind::UndefinedVariable(name_tok.lexeme.to_string()),
          line: name_tok.line,
        })?;
      self.compile_expression(1)?;
      self.expect(TokenKind::EndStatement, CompileErrorKind::ExpectedEndStatement)?;
      self.chunk.emit_op(OpCode::VAR_STOR, name_tok.line);
      self.chunk.emit_u8(depth, name_tok.line);
      self.chunk.emit_u8(slot, name_tok.line);
      self.chunk.emit_op(OpCode::POP, name_tok.line);
      return Ok(false);
    }

    self.compile_expression(1)?;
    self.expect(TokenKind::EndStatement, CompileErrorKind::ExpectedEndStatement)?;
    self.chunk.emit_op(OpCode::POP, self.line());
    Ok(false)
  }

  /// `"if" "(" Expression ")" Statement [ "else" Statement ]`
  fn compile_if_stmt(&mut self) -> Result<(), CompileError> {
    self.expect_keyword("if", CompileErrorKind::MalformedIf)?;
    self.expect_lexeme(TokenKind::Parenthesis, "(", CompileErrorKind::ExpectedOpenParenthesis)?;
    self.compile_expression(1)?;
    self.expect_lexeme(TokenKind::Parenthesis, ")", CompileErrorKind::ExpectedOpenParenthesis)?;

    let line = self.line();
    self.chunk.emit_op(OpCode::FCOND_GOTO, line);
    let else_jump = self.chunk.mark();
    self.chunk.emit_i32(0, line);

    self.compile_statement()?;

    if self.check_keyword("else") {
      self.advance()?;
      let line = self.line();
      self.chunk.emit_op(OpCode::GOTO, line);
      let end_jump = self.chunk.mark();
      self.chunk.emit_i32(0, line);

      let else_target = self.chunk.len() as i32;
      self.chunk.patch_i32(else_jump, else_target);

      self.compile_statement()?;

      let end_target = self.chunk.len() as i32;
      self.chunk.patch_i32(end_jump, end_target);
    } else {
      let else_target = self.chunk.len() as i32;
      self.chunk.patch_i32(else_jump, else_target);
    }

    Ok(())
  }

  /// `"while" "(" Expression ")" Statement`
  fn compile_while_stmt(&mut self) -> Result<(), CompileError> {
    self.expect_keyword("while", CompileErrorKind::MalformedLoop)?;

    let loop_start = self.chunk.len() as i32;
    self.expect_lexeme(TokenKind::Parenthesis, "(", CompileErrorKind::ExpectedOpenParenthesis)?;
    self.compile_expression(1)?;
    self.expect_lexeme(TokenKind::Parenthesis, ")", CompileErrorKind::ExpectedOpenParenthesis)?;

    let line = self.line();
    self.chunk.emit_op(OpCode::FCOND_GOTO, line);
    let exit_jump = self.chunk.mark();
    self.chunk.emit_i32(0, line);

    self.compile_statement()?;

    self.chunk.emit_op(OpCode::GOTO, self.line());
    self.chunk.emit_i32(loop_start, self.line());

    let after_loop = self.chunk.len() as i32;
    self.chunk.patch_i32(exit_jump, after_loop);

    Ok(())
  }

  /// `"do" Statement "while" "(" Expression ")" ";"`
  fn compile_do_while_stmt(&mut self) -> Result<(), CompileError> {
    self.expect_keyword("do", CompileErrorKind::MalformedLoop)?;

    let loop_start = self.chunk.len() as i32;
    self.compile_statement()?;

    self.expect_keyword("while", CompileErrorKind::MalformedLoop)?;
    self.expect_lexeme(TokenKind::Parenthesis, "(", CompileErrorKind::ExpectedOpenParenthesis)?;
    self.compile_expression(1)?;
    self.expect_lexeme(TokenKind::Parenthesis, ")", CompileErrorKind::ExpectedOpenParenthesis)?;
    self.expect(TokenKind::EndStatement, CompileErrorKind::ExpectedEndStatement)?;

    self.chunk.emit_op(OpCode::TCOND_GOTO, self.line());
    self.chunk.emit_i32(loop_start, self.line());

    Ok(())
  }
}
