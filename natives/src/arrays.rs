//! `array_*` natives: a fixed-length, host-owned array of script `Value`s,
//! grounded on `libarray.c`'s `vmn_array*` callbacks.

use core::errors::RuntimeErrorKind;
use objects::{ArrayObject, LibData, Value};
use vm::{NativeRegistry, Vm};

use crate::{number_arg, require_arity};

pub(crate) fn install(natives: &mut NativeRegistry) -> Result<(), RuntimeErrorKind> {
  natives.register("array", array_new)?;
  natives.register("array_size", array_size)?;
  natives.register("array_set", array_set)?;
  natives.register("array_get", array_get)?;
  Ok(())
}

fn array_arg<'a>(args: &'a [Value], i: usize) -> Result<&'a ArrayObject, RuntimeErrorKind> {
  args
    .get(i)
    .and_then(Value::as_lib_data)
    .and_then(|d| d.downcast_ref::<ArrayObject>(objects::array_obj::TYPE_TAG))
    .ok_or(RuntimeErrorKind::InvalidTypeInOperation)
}

fn array_new(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  let size = number_arg(args, 0)? as isize;
  if size < 1 {
    return Err(RuntimeErrorKind::ArgumentOutOfRange);
  }
  Ok(Some(Value::LibData(LibData::new(ArrayObject::new(size as usize)))))
}

fn array_size(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(array_arg(args, 0)?.len() as f64)))
}

fn array_set(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 3)?;
  let array = array_arg(args, 0)?;
  let index = number_arg(args, 1)? as isize;
  if index < 0 {
    return Err(RuntimeErrorKind::ArgumentOutOfRange);
  }
  if !array.set(index as usize, args[2].clone()) {
    return Err(RuntimeErrorKind::ArgumentOutOfRange);
  }
  Ok(None)
}

fn array_get(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 2)?;
  let array = array_arg(args, 0)?;
  let index = number_arg(args, 1)? as isize;
  if index < 0 {
    return Err(RuntimeErrorKind::ArgumentOutOfRange);
  }
  array.get(index as usize).map(Some).ok_or(RuntimeErrorKind::ArgumentOutOfRange)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn array_round_trips_set_and_get() {
    let mut vm = Vm::new(64, 8);
    let arr = array_new(&mut vm, &[Value::Number(3.0)]).unwrap().unwrap();
    array_set(&mut vm, &[arr.clone(), Value::Number(1.0), Value::Number(9.0)]).unwrap();
    let got = array_get(&mut vm, &[arr, Value::Number(1.0)]).unwrap().unwrap();
    assert!(matches!(got, Value::Number(n) if (n - 9.0).abs() < f64::EPSILON));
  }

  #[test]
  fn array_get_out_of_range_is_an_error() {
    let mut vm = Vm::new(64, 8);
    let arr = array_new(&mut vm, &[Value::Number(2.0)]).unwrap().unwrap();
    let err = array_get(&mut vm, &[arr, Value::Number(5.0)]).unwrap_err();
    assert_eq!(err, RuntimeErrorKind::ArgumentOutOfRange);
  }

  #[test]
  fn array_new_rejects_zero_size() {
    let mut vm = Vm::new(64, 8);
    let err = array_new(&mut vm, &[Value::Number(0.0)]).unwrap_err();
    assert_eq!(err, RuntimeErrorKind::ArgumentOutOfRange);
  }
}
