use core::errors::RuntimeErrorKind;
use objects::Value;

use crate::Vm;

impl Vm {
  /// Implements `ADD`: numeric addition, or string concatenation if either
  /// operand is a string. Per the spec, `ADD` is the single overloaded
  /// opcode for both; there is no separate concatenation opcode.
  pub(super) fn perform_add(&mut self) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;

    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
      return self.push_operand(Value::Number(a + b));
    }

    let is_string =
      |v: &Value| v.as_lib_data().map_or(false, |d| d.type_tag() == objects::str_obj::TYPE_TAG);
    if is_string(&lhs) || is_string(&rhs) {
      let result = format!("{}{}", lhs, rhs);
      return self.push_operand(Value::LibData(objects::LibData::new(
        objects::str_obj::StrObject::new(result),
      )));
    }

    self.set_err(RuntimeErrorKind::InvalidTypeInOperation)
  }

  pub(super) fn perform_sub(&mut self) -> Result<(), RuntimeErrorKind> {
    self.numeric_binop(|a, b| a - b)
  }

  pub(super) fn perform_mul(&mut self) -> Result<(), RuntimeErrorKind> {
    self.numeric_binop(|a, b| a * b)
  }

  pub(super) fn perform_div(&mut self) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;
    let (a, b) = self.numeric_pair(&lhs, &rhs)?;
    if b == 0.0 {
      return self.set_err(RuntimeErrorKind::DivideByZero);
    }
    self.push_operand(Value::Number(a / b))
  }

  pub(super) fn perform_mod(&mut self) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;
    let (a, b) = self.numeric_pair(&lhs, &rhs)?;
    if b == 0.0 {
      return self.set_err(RuntimeErrorKind::DivideByZero);
    }
    self.push_operand(Value::Number(a % b))
  }

  fn numeric_binop(&mut self, f: impl FnOnce(f64, f64) -> f64) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;
    let (a, b) = self.numeric_pair(&lhs, &rhs)?;
    self.push_operand(Value::Number(f(a, b)))
  }

  fn numeric_pair(&mut self, lhs: &Value, rhs: &Value) -> Result<(f64, f64), RuntimeErrorKind> {
    match (lhs.as_number(), rhs.as_number()) {
      (Some(a), Some(b)) => Ok((a, b)),
      _ => {
        self.error = Some(RuntimeErrorKind::InvalidTypeInOperation);
        Err(RuntimeErrorKind::InvalidTypeInOperation)
      }
    }
  }

  /// Numeric comparisons (`<`, `>`, `<=`, `>=`) only accept numbers; string
  /// and boolean comparisons are out of scope per the spec's Non-goals.
  pub(super) fn perform_compare(
    &mut self,
    f: impl FnOnce(f64, f64) -> bool,
  ) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;
    let (a, b) = self.numeric_pair(&lhs, &rhs)?;
    self.push_operand(Value::Boolean(f(a, b)))
  }

  /// `EQUALS`/`NOT_EQUALS` compare across any value type: numbers
  /// numerically, booleans and null by identity, strings by content, and
  /// any other host object by reference.
  pub(super) fn perform_equals(&mut self, negate: bool) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;
    let equal = values_equal(&lhs, &rhs);
    self.push_operand(Value::Boolean(equal ^ negate))
  }

  pub(super) fn perform_and(&mut self) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;
    let (a, b) = self.boolean_pair(&lhs, &rhs)?;
    self.push_operand(Value::Boolean(a && b))
  }

  pub(super) fn perform_or(&mut self) -> Result<(), RuntimeErrorKind> {
    let rhs = self.pop_operand()?;
    let lhs = self.pop_operand()?;
    let (a, b) = self.boolean_pair(&lhs, &rhs)?;
    self.push_operand(Value::Boolean(a || b))
  }

  pub(super) fn perform_not(&mut self) -> Result<(), RuntimeErrorKind> {
    let val = self.pop_operand()?;
    match val.as_boolean() {
      Some(b) => self.push_operand(Value::Boolean(!b)),
      None => self.set_err(RuntimeErrorKind::InvalidTypeInOperation),
    }
  }

  fn boolean_pair(&mut self, lhs: &Value, rhs: &Value) -> Result<(bool, bool), RuntimeErrorKind> {
    match (lhs.as_boolean(), rhs.as_boolean()) {
      (Some(a), Some(b)) => Ok((a, b)),
      _ => {
        self.error = Some(RuntimeErrorKind::InvalidTypeInOperation);
        Err(RuntimeErrorKind::InvalidTypeInOperation)
      }
    }
  }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
  match (lhs, rhs) {
    (Value::Null, Value::Null) => true,
    (Value::Boolean(a), Value::Boolean(b)) => a == b,
    (Value::Number(a), Value::Number(b)) => a == b,
    (Value::LibData(a), Value::LibData(b)) => {
      match (
        a.downcast_ref::<objects::str_obj::StrObject>(objects::str_obj::TYPE_TAG),
        b.downcast_ref::<objects::str_obj::StrObject>(objects::str_obj::TYPE_TAG),
      ) {
        (Some(sa), Some(sb)) => *sa.as_str() == *sb.as_str(),
        _ => a.ptr_eq(b),
      }
    }
    _ => false,
  }
}
