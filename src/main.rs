use std::fmt;
use std::fs;
use std::process::ExitCode;

use core::errors::RuntimeErrorKind;
use core::gxb::{self, ExportedFunction};

const OPERAND_STACK_MAX: usize = 1024;
const NATIVE_CAPACITY: usize = 64;

fn main() -> ExitCode {
  let args: Vec<String> = std::env::args().collect();

  let result = match args.as_slice() {
    [_, cmd, a, b] if cmd == "build-script" => build_script(a, b),
    [_, cmd, entry, source] if cmd == "run-script" => run_script(entry, source),
    [_, cmd, entry, bytecode] if cmd == "run-bytecode" => run_bytecode(entry, bytecode),
    _ => {
      eprintln!("usage:");
      eprintln!("  gunderscript build-script <source.gxs> <out.gxb>");
      eprintln!("  gunderscript run-script   <entry> <source.gxs>");
      eprintln!("  gunderscript run-bytecode <entry> <bytecode.gxb>");
      return ExitCode::FAILURE;
    }
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      println!("{e}");
      ExitCode::FAILURE
    }
  }
}

fn build_script(source_path: &str, out_path: &str) -> Result<(), AppError> {
  let source = fs::read_to_string(source_path).map_err(AppError::Io)?;

  let mut scratch_vm = vm::Vm::new(OPERAND_STACK_MAX, NATIVE_CAPACITY);
  natives::install_stdlib(&mut scratch_vm).map_err(AppError::Runtime)?;

  let unit = compiler::compile(&source, scratch_vm.natives()).map_err(AppError::Compile)?;

  let exported: Vec<ExportedFunction> = unit
    .functions
    .values()
    .map(|f| ExportedFunction {
      name: f.name.clone(),
      entry: f.entry,
      arg_count: f.arg_count,
      total_slots: f.total_slots,
      exported: f.exported,
    })
    .collect();

  gxb::write_gxb(out_path, &exported, &unit.code).map_err(AppError::Gxb)
}

fn run_script(entry: &str, source_path: &str) -> Result<(), AppError> {
  let source = fs::read_to_string(source_path).map_err(AppError::Io)?;

  let mut vm = vm::Vm::new(OPERAND_STACK_MAX, NATIVE_CAPACITY);
  natives::install_stdlib(&mut vm).map_err(AppError::Runtime)?;

  let unit = compiler::compile(&source, vm.natives()).map_err(AppError::Compile)?;
  vm.load(unit.code, unit.functions);
  vm.execute_function(entry).map_err(AppError::Runtime)
}

fn run_bytecode(entry: &str, bytecode_path: &str) -> Result<(), AppError> {
  let (functions, code) = gxb::read_gxb(bytecode_path).map_err(AppError::Gxb)?;

  let mut vm = vm::Vm::new(OPERAND_STACK_MAX, NATIVE_CAPACITY);
  natives::install_stdlib(&mut vm).map_err(AppError::Runtime)?;

  let functions = functions
    .into_iter()
    .map(|f| {
      (
        f.name.clone(),
        vm::FunctionDescriptor { name: f.name, entry: f.entry, arg_count: f.arg_count, total_slots: f.total_slots, exported: f.exported },
      )
    })
    .collect();

  vm.load(code, functions);
  vm.execute_function(entry).map_err(AppError::Runtime)
}

/// The three disjoint error spaces the embedding API exposes (§7): a
/// compile-time error, a runtime error, and everything at the host-API
/// boundary (file I/O, bytecode container format).
enum AppError {
  Io(std::io::Error),
  Compile(core::errors::CompileError),
  Runtime(RuntimeErrorKind),
  Gxb(gxb::GxbError),
}

impl fmt::Display for AppError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AppError::Io(e) => write!(f, "i/o error: {e}"),
      AppError::Compile(e) => write!(f, "{e}"),
      AppError::Runtime(e) => write!(f, "{e}"),
      AppError::Gxb(e) => write!(f, "{e}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_path(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir();
    dir.join(format!("gunderscript-main-test-{tag}-{:p}", &dir))
  }

  /// Scenario 8 / the "round-trip" invariant of §8: `build-script` then
  /// `run-bytecode` must load the exact same code and function table that
  /// `run-script` compiles directly, so execution is indistinguishable.
  #[test]
  fn build_then_run_bytecode_round_trips_the_compiled_unit() {
    let source_path = scratch_path("source.gxs");
    let gxb_path = scratch_path("out.gxb");
    fs::write(&source_path, "function exported main() { sys_print(1 + 2 * 3); }").unwrap();

    build_script(source_path.to_str().unwrap(), gxb_path.to_str().unwrap()).expect("build-script should succeed");

    let direct_source = fs::read_to_string(&source_path).unwrap();
    let mut direct_vm = vm::Vm::new(OPERAND_STACK_MAX, NATIVE_CAPACITY);
    natives::install_stdlib(&mut direct_vm).unwrap();
    let direct_unit = compiler::compile(&direct_source, direct_vm.natives()).unwrap();

    let (loaded_functions, loaded_code) = gxb::read_gxb(&gxb_path).unwrap();

    assert_eq!(loaded_code, direct_unit.code);
    let direct_main = direct_unit.functions.get("main").unwrap();
    let loaded_main = loaded_functions.iter().find(|f| f.name == "main").unwrap();
    assert_eq!(loaded_main.entry, direct_main.entry);
    assert_eq!(loaded_main.total_slots, direct_main.total_slots);
    assert_eq!(loaded_main.arg_count, direct_main.arg_count);

    run_bytecode("main", gxb_path.to_str().unwrap()).expect("run-bytecode should succeed");
    run_script("main", source_path.to_str().unwrap()).expect("run-script should succeed");

    let _ = fs::remove_file(&source_path);
    let _ = fs::remove_file(&gxb_path);
  }

  #[test]
  fn run_bytecode_rejects_a_gxb_from_a_different_build_fingerprint() {
    let gxb_path = scratch_path("bad-fingerprint.gxb");
    fs::write(&gxb_path, b"not a real bytecode file at all").unwrap();

    let err = run_bytecode("main", gxb_path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, AppError::Gxb(gxb::GxbError::NotABytecodeFile)));

    let _ = fs::remove_file(&gxb_path);
  }
}
