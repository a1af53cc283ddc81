//! Thin native callbacks exposing the host's math, string, system/file, and
//! array facilities to script code (the "standard library" the design notes
//! describe as external collaborators of the core, reachable only through
//! the `CALL_NATIVE` ABI). Each function here matches [`vm::NativeFn`] and
//! is wired into a [`vm::Vm`] via [`install_stdlib`].

mod arrays;
mod math;
mod strings;
mod sys;

use core::errors::RuntimeErrorKind;
use objects::Value;
use vm::Vm;

/// Registers every native function this crate provides. The host calls
/// this once, before the first `execute_function`, the way `libmath_install`
/// / `libstr_install` / `libsys_install` / `libarray_install` were each
/// called from the embedding application.
pub fn install_stdlib(vm: &mut Vm) -> Result<(), RuntimeErrorKind> {
  math::install(vm.natives_mut())?;
  strings::install(vm.natives_mut())?;
  sys::install(vm.natives_mut())?;
  arrays::install(vm.natives_mut())?;
  Ok(())
}

/// Checks that exactly `expected` arguments were supplied.
fn require_arity(args: &[Value], expected: usize) -> Result<(), RuntimeErrorKind> {
  if args.len() != expected {
    return Err(RuntimeErrorKind::IncorrectArgCount);
  }
  Ok(())
}

fn number_arg(args: &[Value], i: usize) -> Result<f64, RuntimeErrorKind> {
  args.get(i).and_then(Value::as_number).ok_or(RuntimeErrorKind::InvalidTypeInOperation)
}

/// Extracts the owned contents of a `LIBSTR.STR` argument.
fn string_arg(args: &[Value], i: usize) -> Result<String, RuntimeErrorKind> {
  let value = args.get(i).ok_or(RuntimeErrorKind::InvalidTypeInOperation)?;
  let data = value.as_lib_data().ok_or(RuntimeErrorKind::InvalidTypeInOperation)?;
  let s = data.downcast_ref::<objects::StrObject>(objects::str_obj::TYPE_TAG).ok_or(RuntimeErrorKind::InvalidTypeInOperation)?;
  Ok(s.to_owned_string())
}

fn push_string(s: impl Into<String>) -> Result<Option<Value>, RuntimeErrorKind> {
  Ok(Some(Value::LibData(objects::LibData::new(objects::StrObject::new(s.into())))))
}
