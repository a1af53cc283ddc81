//! Single-pass recursive-descent compiler (C3): parses function
//! definitions, variable declarations, statements, and expressions
//! directly into bytecode via [`core::bytecode::Chunk`], with no
//! intermediate AST.

mod functions;
mod precedence;
mod statements;
mod symbols;

use hashbrown::HashMap;

use core::bytecode::Chunk;
use core::errors::{CompileError, CompileErrorKind};
use core::tokens::{Token, TokenKind};
use lexer::Lexer;
use vm::{FunctionDescriptor, NativeRegistry};

use symbols::SymbolTable;

/// A compiled program: the flat code buffer and the function table the VM
/// loads alongside it.
pub struct CompiledUnit {
  pub code: Vec<u8>,
  pub functions: HashMap<String, FunctionDescriptor>,
}

/// A function signature discovered during the header pre-scan, before its
/// body (and therefore its entry offset) is known.
#[derive(Clone)]
pub(crate) struct FunctionSignature {
  pub arg_count: usize,
  pub exported: bool,
}

/// A call site compiled before its callee's entry offset and slot count
/// were known; patched once the callee finishes compiling.
pub(crate) struct PendingCall {
  pub total_slots_offset: usize,
  pub addr_offset: usize,
}

/// Compiles `source` into a [`CompiledUnit`]. `natives` is consulted to
/// resolve call sites against the registered native callback table; it is
/// not mutated.
pub fn compile(source: &str, natives: &NativeRegistry) -> Result<CompiledUnit, CompileError> {
  let signatures = functions::prescan_signatures(source)?;

  let mut compiler = Compiler {
    lexer: Lexer::new(source),
    chunk: Chunk::new(),
    scopes: Vec::new(),
    functions: HashMap::new(),
    signatures,
    pending_calls: HashMap::new(),
    natives,
  };

  compiler.compile_program()?;

  // Every name in `pending_calls` came from the header pre-scan, and the
  // program loop above compiles every pre-scanned function's body, so no
  // pending call site can survive a successful compile.
  debug_assert!(compiler.pending_calls.is_empty());

  Ok(CompiledUnit { code: compiler.chunk.into_code(), functions: compiler.functions })
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use core::errors::RuntimeErrorKind;
  use vm::{NativeRegistry, Vm};

  use super::*;

  thread_local! {
    static PRINTED: RefCell<String> = RefCell::new(String::new());
  }

  fn recording_sys_print(_vm: &mut Vm, args: &[objects::Value]) -> Result<Option<objects::Value>, RuntimeErrorKind> {
    PRINTED.with(|p| {
      for arg in args {
        p.borrow_mut().push_str(&arg.to_string());
      }
    });
    Ok(None)
  }

  /// Builds a `Vm` with `sys_print` wired to the thread-local recorder
  /// instead of stdout, compiles `source`, loads it, and runs `main`.
  /// Returns everything `sys_print` was called with, concatenated.
  fn run_and_capture(source: &str) -> String {
    PRINTED.with(|p| p.borrow_mut().clear());

    let mut vm = Vm::new(64, 8);
    vm.natives_mut().register("sys_print", recording_sys_print).unwrap();

    let unit = compile(source, vm.natives()).expect("compile should succeed");
    vm.load(unit.code, unit.functions);
    vm.execute_function("main").expect("execution should succeed");

    PRINTED.with(|p| p.borrow().clone())
  }

  #[test]
  fn hello_number_prints_seven() {
    assert_eq!(run_and_capture("function exported main() { sys_print(1 + 2 * 3); }"), "7.000000");
  }

  #[test]
  fn while_loop_counts_to_three() {
    let src = "function exported main() {
      var i; i = 0;
      while (i < 3) { sys_print(i); i = i + 1; }
    }";
    assert_eq!(run_and_capture(src), "0.0000001.0000002.000000");
  }

  #[test]
  fn do_while_runs_its_body_once() {
    let src = "function exported main() { do { sys_print(1); } while (false); }";
    assert_eq!(run_and_capture(src), "1.000000");
  }

  #[test]
  fn if_else_takes_the_true_branch() {
    let src = "function exported main() {
      if (2 == 2) { sys_print(true); } else { sys_print(false); }
    }";
    assert_eq!(run_and_capture(src), "true");
  }

  #[test]
  fn duplicate_variable_in_the_same_block_is_a_compile_error() {
    let natives = NativeRegistry::new(0);
    let err = compile("function exported main() { var x; var x; }", &natives).unwrap_err();
    assert!(matches!(err.kind, CompileErrorKind::PreviouslyDefinedVariable(name) if name == "x"));
    assert_eq!(err.line, 1);
  }

  #[test]
  fn calling_an_undefined_function_is_a_compile_error() {
    let natives = NativeRegistry::new(0);
    let err = compile("function exported main() { no_such(); }", &natives).unwrap_err();
    assert!(matches!(err.kind, CompileErrorKind::UndefinedFunction(name) if name == "no_such"));
  }

  #[test]
  fn divide_by_zero_compiles_but_fails_at_runtime() {
    let mut vm = Vm::new(64, 8);
    vm.natives_mut().register("sys_print", recording_sys_print).unwrap();

    let unit = compile("function exported main() { sys_print(1/0); }", vm.natives()).expect("compile should succeed");
    vm.load(unit.code, unit.functions);

    let err = vm.execute_function("main").unwrap_err();
    assert_eq!(err, RuntimeErrorKind::DivideByZero);
  }

  #[test]
  fn forward_reference_to_a_function_defined_later_resolves() {
    let src = "function exported main() { helper(); }
               function helper() { }";
    let natives = NativeRegistry::new(0);
    compile(src, &natives).expect("forward call should resolve once helper finishes compiling");
  }
}

pub(crate) struct Compiler<'a> {
  lexer: Lexer<'a>,
  chunk: Chunk,
  scopes: Vec<SymbolTable>,
  functions: HashMap<String, FunctionDescriptor>,
  signatures: HashMap<String, FunctionSignature>,
  pending_calls: HashMap<String, Vec<PendingCall>>,
  natives: &'a NativeRegistry,
}

impl<'a> Compiler<'a> {
  fn line(&self) -> usize {
    self.lexer.line()
  }

  fn err(&self, kind: CompileErrorKind) -> CompileError {
    CompileError { kind, line: self.line() }
  }

  fn current(&self) -> Token<'a> {
    *self.lexer.current()
  }

  fn peek(&self) -> Token<'a> {
    *self.lexer.peek()
  }

  fn advance(&mut self) -> Result<Token<'a>, CompileError> {
    let tok = self.current();
    self.lexer.advance();
    if let Some(lex_err) = self.lexer.error() {
      return Err(self.err(CompileErrorKind::Lexer(lex_err)));
    }
    Ok(tok)
  }

  fn check(&self, kind: TokenKind) -> bool {
    self.current().is(kind)
  }

  fn check_keyword(&self, word: &str) -> bool {
    self.current().is(TokenKind::KeyVar) && self.current().lexeme == word
  }

  /// Consumes the current token if it is the keyword `word`, else errors.
  fn expect_keyword(&mut self, word: &str, kind: CompileErrorKind) -> Result<(), CompileError> {
    if self.check_keyword(word) {
      self.advance()?;
      Ok(())
    } else {
      Err(self.err(kind))
    }
  }

  fn expect(&mut self, kind: TokenKind, err_kind: CompileErrorKind) -> Result<Token<'a>, CompileError> {
    if self.check(kind) {
      self.advance()
    } else {
      Err(self.err(err_kind))
    }
  }

  fn expect_lexeme(&mut self, kind: TokenKind, lexeme: &str, err_kind: CompileErrorKind) -> Result<(), CompileError> {
    if self.check(kind) && self.current().lexeme == lexeme {
      self.advance()?;
      Ok(())
    } else {
      Err(self.err(err_kind))
    }
  }

  /// Resolves `name` against the scope stack, innermost first, returning
  /// `(depth, slot)` if found. Depth 0 is the current (top) frame.
  fn resolve(&self, name: &str) -> Option<(u8, u8)> {
    for (i, scope) in self.scopes.iter().rev().enumerate() {
      if let Some(slot) = scope.find(name) {
        return Some((i as u8, slot));
      }
    }
    None
  }

  fn compile_program(&mut self) -> Result<(), CompileError> {
    // `Lexer::new` already primes `current`/`peek` to the first two
    // tokens, so no initial advance is needed here.
    while !self.check(TokenKind::Eof) {
      self.compile_function_def()?;
    }
    Ok(())
  }
}
