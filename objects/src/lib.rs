//! The dynamic script [`Value`] and the host-object protocol (C5) that lets
//! native callbacks expose opaque, reference-counted objects — strings,
//! arrays, files, string-builders — to script code.
//!
//! A host object's refcount is not tracked by hand: `Rc<dyn HostObject>` is
//! the "owned/shared smart handle" the design notes call out as the
//! target-language idiom for this. Cloning a [`Value::LibData`] onto a
//! frame slot or the operand stack bumps the `Rc` strong count exactly
//! where the C original would call `inc_refcount`; dropping it is
//! `dec_refcount`. When the last handle is dropped, the object's `Drop`
//! impl is its cleanup hook.

pub mod array_obj;
pub mod file_obj;
pub mod str_builder_obj;
pub mod str_obj;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

pub use array_obj::ArrayObject;
pub use file_obj::FileObject;
pub use str_builder_obj::StrBuilderObject;
pub use str_obj::StrObject;

/// The contract a native callback uses to expose an opaque object to
/// script code. Every host object carries a short type tag (e.g.
/// `LIBARRAY.0`, `LIBSTR.STR`, `SYS.FILE`) so that native code unwrapping a
/// [`LibData`] can check it is the kind of object it expects instead of
/// misinterpreting another object kind's payload.
pub trait HostObject: fmt::Debug {
  /// The short tag identifying this object's concrete kind.
  fn type_tag(&self) -> &'static str;

  fn as_any(&self) -> &dyn Any;
}

/// A reference-counted handle to a host object. Cloning increments the
/// refcount; the last drop runs the object's cleanup.
#[derive(Debug, Clone)]
pub struct LibData(Rc<dyn HostObject>);

impl LibData {
  pub fn new(obj: impl HostObject + 'static) -> Self {
    LibData(Rc::new(obj))
  }

  pub fn type_tag(&self) -> &'static str {
    self.0.type_tag()
  }

  /// Downcasts to a concrete host object kind, checking the type tag first
  /// so that, e.g., a `SYS.FILE` handed to a string function is rejected
  /// rather than silently reinterpreted.
  pub fn downcast_ref<T: HostObject + 'static>(&self, expected_tag: &str) -> Option<&T> {
    if self.0.type_tag() != expected_tag {
      return None;
    }
    self.0.as_any().downcast_ref::<T>()
  }

  pub fn strong_count(&self) -> usize {
    Rc::strong_count(&self.0)
  }

  pub fn ptr_eq(&self, other: &LibData) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

/// The dynamic, tagged script value. Copying a [`Value::LibData`] bumps the
/// underlying object's refcount (see [`LibData`]); the other variants are
/// plain data and copy for free.
#[derive(Debug, Clone)]
pub enum Value {
  Null,
  Boolean(bool),
  Number(f64),
  LibData(LibData),
}

impl Value {
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Boolean(_) => "boolean",
      Value::Number(_) => "number",
      Value::LibData(data) => data.type_tag(),
    }
  }

  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_boolean(&self) -> Option<bool> {
    match self {
      Value::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_lib_data(&self) -> Option<&LibData> {
    match self {
      Value::LibData(d) => Some(d),
      _ => None,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, "null"),
      Value::Boolean(b) => write!(f, "{}", b),
      Value::Number(n) => write!(f, "{:.6}", n),
      Value::LibData(data) => {
        if let Some(s) = data.downcast_ref::<StrObject>(str_obj::TYPE_TAG) {
          write!(f, "{}", s.as_str())
        } else {
          write!(f, "<{}>", data.type_tag())
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn number_displays_with_six_decimal_places() {
    assert_eq!(Value::Number(7.0).to_string(), "7.000000");
  }

  #[test]
  fn cloning_lib_data_increments_the_refcount() {
    let value = Value::LibData(LibData::new(StrObject::new("hi")));
    let data = value.as_lib_data().unwrap();
    assert_eq!(data.strong_count(), 1);

    let second = data.clone();
    assert_eq!(data.strong_count(), 2);

    drop(second);
    assert_eq!(data.strong_count(), 1);
  }

  #[test]
  fn downcast_ref_rejects_the_wrong_type_tag() {
    let data = LibData::new(StrObject::new("hi"));
    assert!(data.downcast_ref::<ArrayObject>(array_obj::TYPE_TAG).is_none());
    assert!(data.downcast_ref::<StrObject>(str_obj::TYPE_TAG).is_some());
  }
}
