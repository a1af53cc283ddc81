use hashbrown::HashMap;

use core::bytecode::OpCode;
use core::errors::{CompileError, CompileErrorKind};
use core::tokens::TokenKind;
use lexer::Lexer;
use vm::FunctionDescriptor;

use crate::symbols::SymbolTable;
use crate::{Compiler, FunctionSignature, PendingCall};

/// Scans the whole source once for `function ["exported"] name(params)`
/// headers, skipping bodies by brace-balance counting, so the real compile
/// pass knows every function's arity up front and can emit `CALL_SCRIPT`
/// at a call site that textually precedes the callee's definition.
pub(crate) fn prescan_signatures(source: &str) -> Result<HashMap<String, FunctionSignature>, CompileError> {
  let mut lexer = Lexer::new(source);
  let mut signatures = HashMap::new();

  while !lexer.current().is(TokenKind::Eof) {
    if !(lexer.current().is(TokenKind::KeyVar) && lexer.current().lexeme == "function") {
      lexer.advance();
      continue;
    }
    lexer.advance();

    let exported = lexer.current().is(TokenKind::KeyVar) && lexer.current().lexeme == "exported";
    if exported {
      lexer.advance();
    }

    if !lexer.current().is(TokenKind::KeyVar) {
      return Err(CompileError { kind: CompileErrorKind::ExpectedFunctionName, line: lexer.line() });
    }
    let name = lexer.current().lexeme.to_string();
    lexer.advance();

    if !(lexer.current().is(TokenKind::Parenthesis) && lexer.current().lexeme == "(") {
      return Err(CompileError { kind: CompileErrorKind::ExpectedOpenParenthesis, line: lexer.line() });
    }
    lexer.advance();

    let mut arg_count = 0usize;
    if !(lexer.current().is(TokenKind::Parenthesis) && lexer.current().lexeme == ")") {
      loop {
        if !lexer.current().is(TokenKind::KeyVar) {
          return Err(CompileError { kind: CompileErrorKind::ExpectedVarName, line: lexer.line() });
        }
        arg_count += 1;
        lexer.advance();
        if lexer.current().is(TokenKind::ArgDelim) {
          lexer.advance();
          continue;
        }
        break;
      }
    }
    if !(lexer.current().is(TokenKind::Parenthesis) && lexer.current().lexeme == ")") {
      return Err(CompileError { kind: CompileErrorKind::ExpectedOpenParenthesis, line: lexer.line() });
    }
    lexer.advance();

    if signatures.contains_key(&name) {
      return Err(CompileError {
        kind: CompileErrorKind::PreviouslyDefinedFunction(name),
        line: lexer.line(),
      });
    }

    if !(lexer.current().is(TokenKind::Brackets) && lexer.current().lexeme == "{") {
      return Err(CompileError { kind: CompileErrorKind::ExpectedOpenBracket, line: lexer.line() });
    }
    skip_balanced_block(&mut lexer)?;

    signatures.insert(name, FunctionSignature { arg_count, exported });
  }

  Ok(signatures)
}

/// Consumes tokens from `{` through its matching `}`, tracking brace depth
/// so nested blocks don't confuse the scan.
fn skip_balanced_block(lexer: &mut Lexer) -> Result<(), CompileError> {
  let mut depth = 0i32;
  loop {
    if lexer.current().is(TokenKind::Eof) {
      return Err(CompileError { kind: CompileErrorKind::ExpectedCloseBracket, line: lexer.line() });
    }
    if lexer.current().is(TokenKind::Brackets) {
      match lexer.current().lexeme {
        "{" => depth += 1,
        "}" => depth -= 1,
        _ => {}
      }
      lexer.advance();
      if depth == 0 {
        return Ok(());
      }
    } else {
      lexer.advance();
    }
  }
}

impl<'a> Compiler<'a> {
  /// `FuncDef := "function" ["exported"] Ident "(" [Ident {"," Ident}] ")" Block`
  pub(crate) fn compile_function_def(&mut self) -> Result<(), CompileError> {
    self.expect_keyword("function", CompileErrorKind::ExpectedFunctionName)?;

    let exported = self.check_keyword("exported");
    if exported {
      self.advance()?;
    }

    let name_tok = self.expect(TokenKind::KeyVar, CompileErrorKind::ExpectedFunctionName)?;
    let name = name_tok.lexeme.to_string();

    self.expect_lexeme(TokenKind::Parenthesis, "(", CompileErrorKind::ExpectedOpenParenthesis)?;

    let mut params = Vec::new();
    if !(self.check(TokenKind::Parenthesis) && self.current().lexeme == ")") {
      loop {
        let param = self.expect(TokenKind::KeyVar, CompileErrorKind::ExpectedVarName)?;
        params.push(param.lexeme.to_string());
        if self.check(TokenKind::ArgDelim) {
          self.advance()?;
          continue;
        }
        break;
      }
    }
    self.expect_lexeme(TokenKind::Parenthesis, ")", CompileErrorKind::ExpectedOpenParenthesis)?;

    let entry = self.chunk.len() as i32;

    let mut scope = SymbolTable::new();
    for param in &params {
      scope.declare(param, self.line())?;
    }
    self.scopes.push(scope);

    let had_return = self.compile_function_body()?;
    if !had_return {
      self.chunk.emit_op(OpCode::NULL_PUSH, self.line());
      self.chunk.emit_op(OpCode::FRM_POP, self.line());
    }
    self.chunk.emit_op(OpCode::EXIT, self.line());

    let locals = self.scopes.pop().expect("function scope pushed above").len();
    let total_slots = (params.len() + locals) as i32;

    self.functions.insert(
      name.clone(),
      FunctionDescriptor { name: name.clone(), entry, arg_count: params.len() as i32, total_slots, exported },
    );

    if let Some(calls) = self.pending_calls.remove(&name) {
      for call in calls {
        self.chunk.patch_u8(call.total_slots_offset, total_slots as u8);
        self.chunk.patch_i32(call.addr_offset, entry);
      }
    }

    Ok(())
  }

  /// Compiles a call to `name` with `args` already pushed left-to-right.
  /// Resolves natives first, then script functions (already compiled or
  /// still pending), matching the compile-time resolution order the spec
  /// requires. Returns whether the call site leaves a result on the stack
  /// (every call form here does, including `return`, whose frame-pop
  /// leaves the callee's value for the caller).
  pub(crate) fn compile_call(&mut self, name: &str, arg_count: usize, line: usize) -> Result<(), CompileError> {
    if let Some(idx) = self.natives.index_of(name) {
      self.chunk.emit_op(OpCode::CALL_NATIVE, line);
      self.chunk.emit_u8(arg_count as u8, line);
      self.chunk.emit_i32(idx as i32, line);
      return Ok(());
    }

    let sig = self
      .signatures
      .get(name)
      .cloned()
      .ok_or_else(|| CompileError { kind: CompileErrorKind::UndefinedFunction(name.to_string()), line })?;

    if sig.arg_count != arg_count {
      return Err(CompileError {
        kind: CompileErrorKind::ArityMismatch { name: name.to_string(), expected: sig.arg_count, got: arg_count },
        line,
      });
    }

    self.chunk.emit_op(OpCode::CALL_SCRIPT, line);
    let total_slots_offset = self.chunk.mark();
    self.chunk.emit_u8(0, line);
    self.chunk.emit_u8(arg_count as u8, line);
    let addr_offset = self.chunk.mark();
    self.chunk.emit_i32(0, line);

    match self.functions.get(name) {
      Some(desc) => {
        self.chunk.patch_u8(total_slots_offset, desc.total_slots as u8);
        self.chunk.patch_i32(addr_offset, desc.entry);
      }
      None => {
        self.pending_calls.entry(name.to_string()).or_default().push(PendingCall {
          total_slots_offset,
          addr_offset,
        });
      }
    }

    Ok(())
  }
}
