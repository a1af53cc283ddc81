//! `math_*` natives: thin wrappers over the standard math functions,
//! grounded on `libmath.c`'s `vmn_math_*` callbacks.

use core::errors::RuntimeErrorKind;
use objects::Value;
use vm::{NativeRegistry, Vm};

use crate::{number_arg, require_arity};

pub(crate) fn install(natives: &mut NativeRegistry) -> Result<(), RuntimeErrorKind> {
  natives.register("math_abs", math_abs)?;
  natives.register("math_sqrt", math_sqrt)?;
  natives.register("math_pow", math_pow)?;
  natives.register("math_round", math_round)?;
  natives.register("math_sin", math_sin)?;
  natives.register("math_cos", math_cos)?;
  natives.register("math_tan", math_tan)?;
  natives.register("math_asin", math_asin)?;
  natives.register("math_acos", math_acos)?;
  natives.register("math_atan", math_atan)?;
  natives.register("math_atan2", math_atan2)?;
  Ok(())
}

fn math_abs(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.abs())))
}

fn math_sqrt(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.sqrt())))
}

fn math_pow(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 2)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.powf(number_arg(args, 1)?))))
}

/// `math_round(value)` rounds to the nearest integer; `math_round(value,
/// precision)` rounds to `precision` decimal places.
fn math_round(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  match args.len() {
    1 => Ok(Some(Value::Number(number_arg(args, 0)?.round()))),
    2 => {
      let value = number_arg(args, 0)?;
      let scale = 10f64.powf(number_arg(args, 1)?);
      Ok(Some(Value::Number((value * scale).round() / scale)))
    }
    _ => Err(RuntimeErrorKind::IncorrectArgCount),
  }
}

fn math_sin(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.sin())))
}

fn math_cos(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.cos())))
}

fn math_tan(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.tan())))
}

fn math_asin(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.asin())))
}

fn math_acos(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.acos())))
}

fn math_atan(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 1)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.atan())))
}

fn math_atan2(_vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, RuntimeErrorKind> {
  require_arity(args, 2)?;
  Ok(Some(Value::Number(number_arg(args, 0)?.atan2(number_arg(args, 1)?))))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn math_round_defaults_to_whole_numbers() {
    let mut vm = Vm::new(64, 8);
    let result = math_round(&mut vm, &[Value::Number(2.6)]).unwrap();
    assert!(matches!(result, Some(Value::Number(n)) if (n - 3.0).abs() < f64::EPSILON));
  }

  #[test]
  fn math_round_honors_precision() {
    let mut vm = Vm::new(64, 8);
    let result = math_round(&mut vm, &[Value::Number(2.345), Value::Number(2.0)]).unwrap();
    assert!(matches!(result, Some(Value::Number(n)) if (n - 2.35).abs() < 1e-9));
  }

  #[test]
  fn math_abs_rejects_wrong_arity() {
    let mut vm = Vm::new(64, 8);
    let err = math_abs(&mut vm, &[]).unwrap_err();
    assert_eq!(err, RuntimeErrorKind::IncorrectArgCount);
  }
}
