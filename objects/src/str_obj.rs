use std::any::Any;
use std::cell::RefCell;
use std::fmt;

use crate::HostObject;

pub const TYPE_TAG: &str = "LIBSTR.STR";

/// A host-owned, mutable string buffer. Concatenation (`ADD` on two
/// strings) always allocates a fresh one; natives like `str_append` mutate
/// an existing buffer in place.
pub struct StrObject {
  buf: RefCell<String>,
}

impl StrObject {
  pub fn new(s: impl Into<String>) -> Self {
    StrObject { buf: RefCell::new(s.into()) }
  }

  pub fn as_str(&self) -> std::cell::Ref<'_, str> {
    std::cell::Ref::map(self.buf.borrow(), |s| s.as_str())
  }

  pub fn to_owned_string(&self) -> String {
    self.buf.borrow().clone()
  }

  pub fn len(&self) -> usize {
    self.buf.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.buf.borrow().is_empty()
  }

  pub fn append(&self, s: &str) {
    self.buf.borrow_mut().push_str(s);
  }
}

impl fmt::Debug for StrObject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "StrObject({:?})", self.buf.borrow())
  }
}

impl HostObject for StrObject {
  fn type_tag(&self) -> &'static str {
    TYPE_TAG
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn append_mutates_the_existing_buffer() {
    let s = StrObject::new("foo");
    s.append("bar");
    assert_eq!(&*s.as_str(), "foobar");
    assert_eq!(s.len(), 6);
  }

  #[test]
  fn to_owned_string_does_not_consume_the_buffer() {
    let s = StrObject::new("hi");
    assert_eq!(s.to_owned_string(), "hi");
    assert_eq!(&*s.as_str(), "hi");
  }
}
