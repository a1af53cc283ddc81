//! `sys_*`, `file_*`, `type`/`is_*`/`to_*` natives: console I/O, reflection,
//! and file handles, grounded on `libsys.c`'s `vmn_*` callbacks.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};

use core::errors::RuntimeErrorKind;
use objects::{FileObject, LibData, Value};
use vm::{NativeRegistry, Vm};

use crate::{number_arg, push_string, require_arity, string_arg};

pub(crate) fn install(natives: &mut NativeRegistry) -> Result<(), RuntimeErrorKind> {
  natives.register("sys_print", sys_print)?;
  natives.register("type", type_of)?;
  natives.register("is_boolean", is_boolean)?;
  natives.register("is_number", is_number)?;
  natives.register("is_null", is_null)?;
  natives.register("is_string", is_string)?;
  natives.register("to_string", to_string_native)?;
  natives.register("to_number", to_number)?;
  natives.register("to_boolean", to_boolean)?;
  natives.register("file_exists", file_exists)?;
  natives.register("file_delete", file_delete)?;
  natives.register("file_open_read", file_open_read)?;
  natives.register("file_open_write", file_open_write)?;
  natives.register("file_close", file_close)?;
  natives.register("file_read_char", file_read_char)?;
  natives.register("file_write_char", file_write_char)?;
  Ok(())
}

/// Prints every argument in its string form with no separators and no
/// trailing newline, matching the original's `printf`-per-argument loop.
fn sys_print(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  for arg in args {
    print!("{}", arg);
  }
  Ok(None)
}

fn type_of(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  let name = match &args[0] {
    Value::Null => "NULL".to_string(),
    Value::Boolean(_) => "BOOLEAN".to_string(),
    Value::Number(_) => "NUMBER".to_string(),
    Value::LibData(data) => format!("LIBDATA{{{}}}", data.type_tag()),
  };
  push_string(name)
}

fn is_boolean(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Boolean(matches!(args[0], Value::Boolean(_)))))
}

fn is_number(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Boolean(matches!(args[0], Value::Number(_)))))
}

fn is_null(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Boolean(matches!(args[0], Value::Null))))
}

fn is_string(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  let is_str = args[0].as_lib_data().map_or(false, |d| d.type_tag() == objects::str_obj::TYPE_TAG);
  Ok(Some(Value::Boolean(is_str)))
}

fn to_string_native(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  push_string(args[0].to_string())
}

fn to_number(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  match &args[0] {
    Value::Number(n) => Ok(Some(Value::Number(*n))),
    Value::Boolean(b) => Ok(Some(Value::Number(if *b { 1.0 } else { 0.0 }))),
    Value::LibData(data) => {
      let s = data.downcast_ref::<objects::StrObject>(objects::str_obj::TYPE_TAG).ok_or(RuntimeErrorKind::InvalidTypeInOperation)?;
      core::utils::parse_number_lexeme(&s.as_str()).map(Value::Number).map(Some).map_err(|_| RuntimeErrorKind::InvalidTypeInOperation)
    }
    Value::Null => Err(RuntimeErrorKind::InvalidTypeInOperation),
  }
}

fn to_boolean(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  match &args[0] {
    Value::Boolean(b) => Ok(Some(Value::Boolean(*b))),
    Value::Number(n) => Ok(Some(Value::Boolean(*n != 0.0))),
    _ => Err(RuntimeErrorKind::InvalidTypeInOperation),
  }
}

fn file_exists(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Boolean(std::path::Path::new(&string_arg(args, 0)?).exists())))
}

fn file_delete(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Boolean(fs::remove_file(string_arg(args, 0)?).is_ok())))
}

fn file_open_read(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  let path = string_arg(args, 0)?;
  match File::open(&path) {
    Ok(file) => Ok(Some(Value::LibData(LibData::new(FileObject::new(file, path))))),
    Err(_) => Ok(Some(Value::Null)),
  }
}

fn file_open_write(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  let path = string_arg(args, 0)?;
  match OpenOptions::new().write(true).create(true).truncate(true).open(&path) {
    Ok(file) => Ok(Some(Value::LibData(LibData::new(FileObject::new(file, path))))),
    Err(_) => Ok(Some(Value::Null)),
  }
}

fn file_arg<'a>(args: &'a [Value], i: usize) -> Result<&'a FileObject, RuntimeErrorKind> {
  args
    .get(i)
    .and_then(Value::as_lib_data)
    .and_then(|d| d.downcast_ref::<FileObject>(objects::file_obj::TYPE_TAG))
    .ok_or(RuntimeErrorKind::InvalidTypeInOperation)
}

fn file_close(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  file_arg(args, 0)?.close();
  Ok(None)
}

fn file_read_char(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  let file = file_arg(args, 0)?;
  if file.is_closed() {
    return Err(RuntimeErrorKind::FileClosed);
  }
  let mut byte = [0u8; 1];
  let read = file.with_file(|f| f.read(&mut byte)).expect("checked not closed above");
  match read {
    Ok(1) => Ok(Some(Value::Number(byte[0] as f64))),
    _ => Ok(Some(Value::Null)),
  }
}

fn file_write_char(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 2)?;
  let file = file_arg(args, 0)?;
  if file.is_closed() {
    return Err(RuntimeErrorKind::FileClosed);
  }
  let code = number_arg(args, 1)? as u32;
  let byte = u8::try_from(code).map_err(|_| RuntimeErrorKind::ArgumentOutOfRange)?;
  file.with_file(|f| f.write_all(&[byte])).expect("checked not closed above").map_err(|_| RuntimeErrorKind::AllocFailed)?;
  Ok(None)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn type_of_tags_lib_data_with_its_tag() {
    let mut vm = Vm::new(64, 8);
    let s = push_string("x").unwrap().unwrap();
    let result = type_of(&mut vm, &[s]).unwrap().unwrap();
    match result {
      Value::LibData(data) => {
        let s = data.downcast_ref::<objects::StrObject>(objects::str_obj::TYPE_TAG).unwrap();
        assert_eq!(&*s.as_str(), "LIBDATA{LIBSTR.STR}");
      }
      _ => panic!("expected a string"),
    }
  }

  #[test]
  fn to_number_parses_numeric_strings() {
    let mut vm = Vm::new(64, 8);
    let s = push_string("42").unwrap().unwrap();
    let result = to_number(&mut vm, &[s]).unwrap().unwrap();
    assert!(matches!(result, Value::Number(n) if (n - 42.0).abs() < f64::EPSILON));
  }

  #[test]
  fn file_read_char_on_closed_file_is_an_error() {
    let mut vm = Vm::new(64, 8);
    let dir = std::env::temp_dir();
    let path = dir.join(format!("gunderscript-natives-test-{:p}", &dir));
    let path = path.to_string_lossy().into_owned();
    let opened = file_open_write(&mut vm, &[push_string(path).unwrap().unwrap()]).unwrap().unwrap();
    file_close(&mut vm, &[opened.clone()]).unwrap();
    let err = file_read_char(&mut vm, &[opened]).unwrap_err();
    assert_eq!(err, RuntimeErrorKind::FileClosed);
  }
}
