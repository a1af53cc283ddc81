//! `string_*` natives: string comparison and an incremental string builder
//! ("workshop"), grounded on `libstr.c`'s `vmn_str_*` callbacks. The append
//! path was left as a `TODO` in that source; finished here since a builder
//! that cannot be appended to serves no purpose.

use core::errors::RuntimeErrorKind;
use objects::{LibData, StrBuilderObject, Value};
use vm::{NativeRegistry, Vm};

use crate::{number_arg, push_string, require_arity, string_arg};

pub(crate) fn install(natives: &mut NativeRegistry) -> Result<(), RuntimeErrorKind> {
  natives.register("string_equals", string_equals)?;
  natives.register("string_workshop", string_workshop)?;
  natives.register("string_workshop_length", string_workshop_length)?;
  natives.register("string_workshop_prealloc", string_workshop_prealloc)?;
  natives.register("string_workshop_append", string_workshop_append)?;
  natives.register("string_workshop_string", string_workshop_string)?;
  Ok(())
}

fn string_equals(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 2)?;
  Ok(Some(Value::Boolean(string_arg(args, 0)? == string_arg(args, 1)?)))
}

fn workshop_arg<'a>(args: &'a [Value], i: usize) -> Result<&'a StrBuilderObject, RuntimeErrorKind> {
  args
    .get(i)
    .and_then(Value::as_lib_data)
    .and_then(|d| d.downcast_ref::<StrBuilderObject>(objects::str_builder_obj::TYPE_TAG))
    .ok_or(RuntimeErrorKind::InvalidTypeInOperation)
}

fn string_workshop(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  let size = number_arg(args, 0)? as isize;
  if size < 1 {
    return Err(RuntimeErrorKind::ArgumentOutOfRange);
  }
  Ok(Some(Value::LibData(LibData::new(StrBuilderObject::with_capacity(size as usize)))))
}

fn string_workshop_length(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(workshop_arg(args, 0)?.len() as f64)))
}

fn string_workshop_prealloc(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 2)?;
  let ws = workshop_arg(args, 0)?;
  let new_size = number_arg(args, 1)? as isize;
  if new_size < 1 {
    return Err(RuntimeErrorKind::ArgumentOutOfRange);
  }
  let new_size = new_size as usize;
  if new_size > ws.len() {
    ws.reserve(new_size - ws.len());
  }
  Ok(None)
}

fn string_workshop_append(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 2)?;
  let ws = workshop_arg(args, 0)?;
  let text = string_arg(args, 1)?;
  ws.append(&text);
  Ok(None)
}

/// Not present in the original library: materializes a workshop's
/// contents as a plain `LIBSTR.STR` value so it can be handed to
/// `sys_print`, `string_equals`, or anywhere else a string is expected.
fn string_workshop_string(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  push_string(workshop_arg(args, 0)?.build())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn string_equals_compares_contents() {
    let mut vm = Vm::new(64, 8);
    let a = push_string("hi").unwrap().unwrap();
    let b = push_string("hi").unwrap().unwrap();
    let result = string_equals(&mut vm, &[a, b]).unwrap();
    assert!(matches!(result, Some(Value::Boolean(true))));
  }

  #[test]
  fn workshop_round_trips_through_append_and_string() {
    let mut vm = Vm::new(64, 8);
    let ws = string_workshop(&mut vm, &[Value::Number(4.0)]).unwrap().unwrap();
    string_workshop_append(&mut vm, &[ws.clone(), push_string("foo").unwrap().unwrap()]).unwrap();
    string_workshop_append(&mut vm, &[ws.clone(), push_string("bar").unwrap().unwrap()]).unwrap();
    let built = string_workshop_string(&mut vm, &[ws]).unwrap().unwrap();
    match built {
      Value::LibData(data) => {
        let s = data.downcast_ref::<objects::StrObject>(objects::str_obj::TYPE_TAG).unwrap();
        assert_eq!(&*s.as_str(), "foobar");
      }
      _ => panic!("expected a string"),
    }
  }

  #[test]
  fn string_workshop_rejects_zero_size() {
    let mut vm = Vm::new(64, 8);
    let err = string_workshop(&mut vm, &[Value::Number(0.0)]).unwrap_err();
    assert_eq!(err, RuntimeErrorKind::ArgumentOutOfRange);
  }
}
